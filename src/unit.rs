//! Test and suite value objects plus their builders.
//!
//! Definitions are plain values produced by [`TestBuilder`] and
//! [`SuiteBuilder`] and handed to [`crate::runner::Runner::define_test`] /
//! [`crate::runner::Runner::define_suite`]. Flag and annotation resolution
//! happens at construction time; nothing here executes anything.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::errors::AttestResult;
use crate::fixtures::Fixtures;
use crate::runner::{Continuation, TestContext};

/// A test body: a procedure that may raise a failure signal.
pub type Body = Rc<dyn Fn(&mut TestContext<'_>) -> AttestResult>;

// ============================================================================
// DEFINITIONS
// ============================================================================

/// A single named, executable check.
pub struct TestDef {
    pub name: String,
    /// Opaque annotation string, forwarded unmodified into outcome records.
    pub annotation: Option<String>,
    pub fixtures: Fixtures,
    /// Weak back-reference to the owning suite, by name. Lookup only, not
    /// ownership: a test may exist unowned, and the owner may be reassigned
    /// only explicitly.
    pub owner: RefCell<Option<String>>,
    pub run_on_define: bool,
    pub body: Body,
}

impl fmt::Debug for TestDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDef")
            .field("name", &self.name)
            .field("annotation", &self.annotation)
            .field("fixtures", &self.fixtures)
            .field("owner", &self.owner.borrow().clone())
            .field("run_on_define", &self.run_on_define)
            .finish_non_exhaustive()
    }
}

/// An ordered, named group of tests and/or nested suites sharing fixtures.
pub struct SuiteDef {
    pub name: String,
    pub annotation: Option<String>,
    pub fixtures: Fixtures,
    /// Ordered child names, resolved against the registry at run time so a
    /// redefinition of a child is picked up on the next run. Insertion order
    /// is preserved exactly; appends are idempotent by name.
    pub children: RefCell<Vec<String>>,
    pub run_on_define: bool,
}

impl fmt::Debug for SuiteDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteDef")
            .field("name", &self.name)
            .field("annotation", &self.annotation)
            .field("fixtures", &self.fixtures)
            .field("children", &self.children.borrow().clone())
            .field("run_on_define", &self.run_on_define)
            .finish()
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

/// Builder for a [`TestDef`].
///
/// # Examples
///
/// ```rust
/// use attest::prelude::*;
///
/// let test = TestBuilder::new("adds")
///     .annotation("two plus two")
///     .body(|_ctx| {
///         if 2 + 2 == 4 {
///             Ok(())
///         } else {
///             Err(AssertionFailure::new("2 + 2 should be 4").raise())
///         }
///     });
/// let mut runner = Runner::new();
/// runner.define_test(test).unwrap();
/// ```
pub struct TestBuilder {
    name: String,
    annotation: Option<String>,
    fixtures: Fixtures,
    owner: Option<String>,
    run_on_define: bool,
    body: Option<Body>,
}

impl TestBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            fixtures: Fixtures::default(),
            owner: None,
            run_on_define: false,
            body: None,
        }
    }

    pub fn annotation(mut self, text: impl Into<String>) -> Self {
        self.annotation = Some(text.into());
        self
    }

    pub fn setup(mut self, hook: impl Fn(&mut TestContext<'_>) -> AttestResult + 'static) -> Self {
        self.fixtures.setup = Some(Rc::new(hook));
        self
    }

    pub fn teardown(
        mut self,
        hook: impl Fn(&mut TestContext<'_>) -> AttestResult + 'static,
    ) -> Self {
        self.fixtures.teardown = Some(Rc::new(hook));
        self
    }

    pub fn fixture(
        mut self,
        wrapper: impl Fn(&mut TestContext<'_>, &mut Continuation<'_>) -> AttestResult + 'static,
    ) -> Self {
        self.fixtures.fixture = Some(Rc::new(wrapper));
        self
    }

    /// Assigns the owning suite by name without going through `add_child`.
    pub fn in_suite(mut self, suite: impl Into<String>) -> Self {
        self.owner = Some(suite.into());
        self
    }

    /// When set, defining the test also runs it immediately (standalone).
    pub fn run_on_define(mut self, run: bool) -> Self {
        self.run_on_define = run;
        self
    }

    pub fn body(mut self, body: impl Fn(&mut TestContext<'_>) -> AttestResult + 'static) -> Self {
        self.body = Some(Rc::new(body));
        self
    }

    /// A bodiless test trivially passes.
    pub(crate) fn build(self) -> TestDef {
        TestDef {
            name: self.name,
            annotation: self.annotation,
            fixtures: self.fixtures,
            owner: RefCell::new(self.owner),
            run_on_define: self.run_on_define,
            body: self.body.unwrap_or_else(|| Rc::new(|_| Ok(()))),
        }
    }
}

/// One declared child of a suite under construction.
pub(crate) enum Child {
    /// A test defined inline with the suite.
    Test(TestBuilder),
    /// A suite nested inline.
    Suite(SuiteBuilder),
    /// An already-registered test or suite, referenced by name.
    Named(String),
}

/// Builder for a [`SuiteDef`] and its inline children.
///
/// Children may be declared inline (`test`, `suite`) or referenced by name
/// (`child`); declaration order is the run order.
pub struct SuiteBuilder {
    pub(crate) name: String,
    pub(crate) annotation: Option<String>,
    pub(crate) fixtures: Fixtures,
    pub(crate) run_on_define: bool,
    pub(crate) children: Vec<Child>,
}

impl SuiteBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            fixtures: Fixtures::default(),
            run_on_define: false,
            children: Vec::new(),
        }
    }

    pub fn annotation(mut self, text: impl Into<String>) -> Self {
        self.annotation = Some(text.into());
        self
    }

    /// Per-test setup, run before each child test of this suite.
    pub fn setup(mut self, hook: impl Fn(&mut TestContext<'_>) -> AttestResult + 'static) -> Self {
        self.fixtures.setup = Some(Rc::new(hook));
        self
    }

    /// Per-test teardown, run after each child test regardless of outcome.
    pub fn teardown(
        mut self,
        hook: impl Fn(&mut TestContext<'_>) -> AttestResult + 'static,
    ) -> Self {
        self.fixtures.teardown = Some(Rc::new(hook));
        self
    }

    /// Per-test fixture, wrapping each child test's own fixture chain.
    pub fn fixture(
        mut self,
        wrapper: impl Fn(&mut TestContext<'_>, &mut Continuation<'_>) -> AttestResult + 'static,
    ) -> Self {
        self.fixtures.fixture = Some(Rc::new(wrapper));
        self
    }

    /// Whole-run wrapper, applied once per suite invocation around the
    /// entire child iteration.
    pub fn wrap(
        mut self,
        wrapper: impl Fn(&mut TestContext<'_>, &mut Continuation<'_>) -> AttestResult + 'static,
    ) -> Self {
        self.fixtures.wrap = Some(Rc::new(wrapper));
        self
    }

    pub fn run_on_define(mut self, run: bool) -> Self {
        self.run_on_define = run;
        self
    }

    /// Declares a test inline; it is registered when the suite is defined
    /// and this suite becomes its owner unless the test names another.
    pub fn test(mut self, test: TestBuilder) -> Self {
        self.children.push(Child::Test(test));
        self
    }

    /// Declares a nested suite inline.
    pub fn suite(mut self, suite: SuiteBuilder) -> Self {
        self.children.push(Child::Suite(suite));
        self
    }

    /// References an already-registered test or suite by name.
    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.children.push(Child::Named(name.into()));
        self
    }
}
