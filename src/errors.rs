//! Attest Error Handling - Unified Encapsulated API
//!
//! Every negative result the framework can produce is a variant of
//! [`AttestError`]. The taxonomy matters: an [`AttestError::Assertion`] is the
//! *normal* negative outcome of a test, while everything else signals a defect
//! in the test, the system under test, or the way the framework is being used.
//! The execution engine converts the first two categories into per-test
//! outcome records at the test boundary; misuse errors surface directly from
//! the API call that caused them.

use std::fmt;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::value::Value;

/// Convenience result alias used throughout the crate.
pub type AttestResult<T = ()> = Result<T, AttestError>;

// ============================================================================
// ASSERTION FAILURE PAYLOAD - the failure signal contract
// ============================================================================

/// One evaluated sub-expression of a failing assertion: the expression text
/// as the assertion vocabulary saw it, and the value it evaluated to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedPart {
    pub expr: String,
    pub value: Value,
}

/// The payload of an assertion failure: a human-readable description plus
/// the evaluated components of the failing expression.
///
/// The core treats the contents as opaque; it stores and forwards them in the
/// outcome record for an external reporter to render. Assertion vocabularies
/// build these with [`AssertionFailure::new`] and [`AssertionFailure::with_part`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionFailure {
    pub description: String,
    pub parts: Vec<EvaluatedPart>,
}

impl AssertionFailure {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            parts: Vec::new(),
        }
    }

    /// Attaches an evaluated sub-expression to the failure.
    pub fn with_part(mut self, expr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parts.push(EvaluatedPart {
            expr: expr.into(),
            value: value.into(),
        });
        self
    }

    /// Wraps the failure in the error type test bodies return.
    pub fn raise(self) -> AttestError {
        AttestError::Assertion(self)
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)?;
        for part in &self.parts {
            write!(f, "\n  {} => {}", part.expr, part.value)?;
        }
        Ok(())
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// The single error type for the framework.
#[derive(Debug, Error, Diagnostic)]
pub enum AttestError {
    /// The expected negative result of a test: an assertion did not hold.
    #[error("assertion failed: {0}")]
    #[diagnostic(code(attest::assertion_failure))]
    Assertion(AssertionFailure),

    /// Any other signal raised during setup, body, fixture, or teardown
    /// execution, including caught panics.
    #[error("unexpected error: {message}")]
    #[diagnostic(
        code(attest::unexpected_error),
        help("This is a defect in the test or the system under test, not an assertion failure.")
    )]
    Unexpected { message: String },

    /// A `fixture` (or suite `wrap`) returned without ever invoking the
    /// continuation it was given, so the wrapped code never ran.
    #[error("fixture for '{unit}' never invoked its continuation")]
    #[diagnostic(
        code(attest::fixture_never_invoked),
        help("A fixture procedure must call the procedure it receives exactly once.")
    )]
    FixtureNeverInvoked { unit: String },

    /// A stub or mock was installed with no test frame open to own its
    /// restoration. This is a framework-usage defect, never a test outcome.
    #[error("cannot {operation} '{target}': no test is currently running")]
    #[diagnostic(
        code(attest::misuse),
        help("Stubs and mocks are scoped to a running test; install them from a test body or hook.")
    )]
    Misuse { operation: String, target: String },

    /// Registry lookup miss.
    #[error("no test or suite named '{name}' is defined")]
    #[diagnostic(code(attest::not_found))]
    NotFound { name: String },

    /// `add_child` (or a run) expected a suite under this name.
    #[error("'{name}' is not a suite")]
    #[diagnostic(code(attest::not_a_suite))]
    NotASuite { name: String },

    /// A call went through the indirection table for a name nothing is
    /// bound to.
    #[error("no callable bound to '{name}'")]
    #[diagnostic(
        code(attest::unbound_callable),
        help("Bind a base implementation with `Runner::bind` before calling or stubbing it.")
    )]
    Unbound { name: String },
}

/// Coarse classification used by reporting and by tests over the framework
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Normal negative test outcome.
    Assertion,
    /// Defect in the test or system under test.
    Unexpected,
    /// The test never actually ran.
    Fixture,
    /// Misuse of the framework API.
    Framework,
}

impl AttestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Assertion(_) => ErrorCategory::Assertion,
            Self::Unexpected { .. } => ErrorCategory::Unexpected,
            Self::FixtureNeverInvoked { .. } => ErrorCategory::Fixture,
            Self::Misuse { .. } | Self::NotFound { .. } | Self::NotASuite { .. } | Self::Unbound { .. } => {
                ErrorCategory::Framework
            }
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion(_))
    }
}
