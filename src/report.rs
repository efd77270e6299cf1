//! Outcome records produced by the execution engine.
//!
//! These are the only things the engine hands outward: one record per test,
//! nested records per suite. Rendering them for humans is the reporter's
//! job, not ours; everything here is serializable so an external reporter
//! can also consume the records as JSON.

use serde::Serialize;

use crate::errors::{AssertionFailure, AttestError};

/// The outcome of one test execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    Pass,
    /// An assertion did not hold; carries the failure signal's description
    /// and evaluated components, forwarded opaquely.
    Fail(AssertionFailure),
    /// Setup, body, fixture, or teardown raised something other than an
    /// assertion failure.
    Error { message: String },
    /// A fixture never invoked its continuation, so the test did not run.
    /// Distinct from failing.
    NotRun { reason: String },
}

impl Outcome {
    pub(crate) fn from_chain(result: Result<(), AttestError>) -> Self {
        match result {
            Ok(()) => Outcome::Pass,
            Err(AttestError::Assertion(failure)) => Outcome::Fail(failure),
            Err(err @ AttestError::FixtureNeverInvoked { .. }) => Outcome::NotRun {
                reason: err.to_string(),
            },
            Err(err) => Outcome::Error {
                message: err.to_string(),
            },
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }
}

/// Outcome record for a single test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestReport {
    pub name: String,
    /// The annotation attached at definition, passed through for reporting.
    pub annotation: Option<String>,
    pub outcome: Outcome,
}

impl TestReport {
    pub fn passed(&self) -> bool {
        self.outcome.is_pass()
    }
}

/// Outcome record for a suite run: one child record per executed child, in
/// declared order, plus any suite-level (wrap) failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    pub name: String,
    pub annotation: Option<String>,
    pub children: Vec<Report>,
    /// Failure of the suite run itself (a `wrap` that raised or never
    /// invoked its continuation), as opposed to a child failing.
    pub error: Option<String>,
}

impl SuiteReport {
    /// A suite passes only when its own run completed and every child
    /// passed. A child that never ran is not a pass.
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.children.iter().all(Report::passed)
    }

    /// Per-leaf-test tallies across the whole subtree.
    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for child in &self.children {
            child.tally(&mut counts);
        }
        counts
    }
}

/// Outcome record for one executed unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Report {
    Test(TestReport),
    Suite(SuiteReport),
}

impl Report {
    pub fn name(&self) -> &str {
        match self {
            Report::Test(t) => &t.name,
            Report::Suite(s) => &s.name,
        }
    }

    pub fn passed(&self) -> bool {
        match self {
            Report::Test(t) => t.passed(),
            Report::Suite(s) => s.passed(),
        }
    }

    /// The test report, when this is one.
    pub fn as_test(&self) -> Option<&TestReport> {
        match self {
            Report::Test(t) => Some(t),
            Report::Suite(_) => None,
        }
    }

    pub fn as_suite(&self) -> Option<&SuiteReport> {
        match self {
            Report::Suite(s) => Some(s),
            Report::Test(_) => None,
        }
    }

    fn tally(&self, counts: &mut Counts) {
        match self {
            Report::Test(t) => match &t.outcome {
                Outcome::Pass => counts.passed += 1,
                Outcome::Fail(_) => counts.failed += 1,
                Outcome::Error { .. } => counts.errored += 1,
                Outcome::NotRun { .. } => counts.not_run += 1,
            },
            Report::Suite(s) => {
                for child in &s.children {
                    child.tally(counts);
                }
            }
        }
    }
}

/// Leaf-test tallies for a suite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub not_run: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.errored + self.not_run
    }
}
