//! Attest: a small unit-testing core.
//!
//! Declare named tests, group them into (possibly nested) suites, attach
//! shared setup/teardown/fixture behavior, and temporarily replace named
//! callables for the duration of a test with guaranteed restoration on every
//! exit path.
//!
//! The pieces, leaves first: [`registry::Registry`] maps names to
//! definitions (latest definition wins); [`runner::Runner`] resolves which
//! fixture layers apply to an invocation, threads the body through them, and
//! records one outcome per test; [`mocks::CallTable`] is the indirection
//! table behind `stub`/`mock`, unwound when the owning test frame exits.
//! Assertion vocabularies and report renderers live outside this crate: they
//! produce [`errors::AssertionFailure`] signals and consume
//! [`report::Report`] records.
//!
//! # Example
//!
//! ```rust
//! use attest::prelude::*;
//!
//! let mut runner = Runner::new();
//! runner.define_suite(
//!     SuiteBuilder::new("math")
//!         .test(TestBuilder::new("addition").body(|_ctx| {
//!             if 1 + 1 == 2 {
//!                 Ok(())
//!             } else {
//!                 Err(AssertionFailure::new("1 + 1 should be 2").raise())
//!             }
//!         })),
//! ).unwrap();
//!
//! let report = runner.invoke("math").unwrap();
//! assert!(report.passed());
//! ```

pub use crate::errors::{AssertionFailure, AttestError, AttestResult};
pub use crate::runner::Runner;

pub mod errors;
pub mod fixtures;
pub mod mocks;
pub mod registry;
pub mod report;
pub mod runner;
pub mod unit;
pub mod value;

pub mod prelude {
    pub use crate::errors::{AssertionFailure, AttestError, AttestResult, EvaluatedPart};
    pub use crate::fixtures::Fixtures;
    pub use crate::registry::Definition;
    pub use crate::report::{Counts, Outcome, Report, SuiteReport, TestReport};
    pub use crate::runner::{Continuation, Runner, TestContext};
    pub use crate::unit::{SuiteBuilder, TestBuilder};
    pub use crate::value::Value;
}
