//! Execution engine and fixture resolver.
//!
//! A [`Runner`] owns the registry, the mockable call table, and the small
//! amount of state the engine needs while running: the current execution
//! depth and the stack of suites on the active run. Execution is strictly
//! single-threaded and synchronous; one test body runs to completion (or
//! failure) before the next begins.
//!
//! # Fixture composition
//!
//! For a test invoked at depth zero, the resolved chain is, outer to inner:
//!
//! ```text
//! wrap( setup_suite( fixture_suite( setup_test( fixture_test( BODY ),
//!       teardown_test ), teardown_suite ) ) )
//! ```
//!
//! The effective suite is the explicit call-site suite when one is given,
//! else the test's recorded owner, else none. Teardown of a layer runs even
//! when that layer's setup or anything inside it raised, and the first error
//! keeps propagating outward through the remaining teardowns. A test invoked
//! from inside an already-running test applies no fixtures at all and opens
//! no mock scope of its own: the enclosing test is assumed to have
//! established the environment already.
//!
//! # Guaranteed release
//!
//! Panics in hooks, fixtures, and bodies are caught at each call site and
//! converted to [`AttestError::Unexpected`], so teardown layers and the mock
//! restoration scope unwind on every exit path.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::errors::{AssertionFailure, AttestError, AttestResult};
use crate::fixtures::{Fixtures, Hook, Wrapper};
use crate::mocks::CallTable;
use crate::registry::{Definition, Registry};
use crate::report::{Outcome, Report, SuiteReport, TestReport};
use crate::unit::{Child, SuiteBuilder, SuiteDef, TestBuilder, TestDef};
use crate::value::Value;

/// Work item passed inward through fixture layers.
type Inner<'a> = Box<dyn FnOnce(&mut Runner) -> AttestResult + 'a>;

/// How a test came to be invoked, for fixture-resolution purposes.
enum CallSite {
    /// Bare-name invocation; fixture context falls back to the recorded
    /// owner, if any.
    Standalone,
    /// Explicit suite context at the call site. Overrides any recorded
    /// owner. `wrap_applied` is set when the suite's `wrap` is already
    /// active around this invocation (i.e. we are inside that suite's run).
    Member {
        suite: Rc<SuiteDef>,
        wrap_applied: bool,
    },
}

// ============================================================================
// CONTINUATION - what a fixture/wrap procedure is given to invoke
// ============================================================================

/// The continuation handed to a `fixture` or `wrap` procedure.
///
/// The procedure must invoke it exactly once for the enclosed code to run.
/// The first invocation executes the enclosed code; later invocations are
/// ignored. A procedure that returns without invoking it at all yields
/// [`AttestError::FixtureNeverInvoked`] for the enclosed unit.
pub struct Continuation<'a> {
    inner: Option<Inner<'a>>,
    outcome: Option<AttestResult>,
}

impl<'a> Continuation<'a> {
    fn new(inner: Inner<'a>) -> Self {
        Self {
            inner: Some(inner),
            outcome: None,
        }
    }

    /// Runs the enclosed code.
    pub fn invoke(&mut self, ctx: &mut TestContext<'_>) {
        if let Some(run) = self.inner.take() {
            self.outcome = Some(run(ctx.runner));
        }
    }

    pub fn has_run(&self) -> bool {
        self.outcome.is_some()
    }

    fn into_outcome(self) -> Option<AttestResult> {
        self.outcome
    }
}

// ============================================================================
// TEST CONTEXT - the handle a running body or hook sees
// ============================================================================

/// Handle passed to test bodies, hooks, and fixture procedures.
///
/// Everything a running test may do to the framework goes through here:
/// installing stubs and mocks (scoped to the current test frame), calling
/// through the mockable table, and invoking other registered units.
pub struct TestContext<'r> {
    runner: &'r mut Runner,
    unit: String,
}

impl<'r> TestContext<'r> {
    /// Name of the unit whose frame this context belongs to.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Replaces `name` with a constant-returning stub until the current
    /// test frame unwinds.
    pub fn stub(&mut self, name: &str, value: impl Into<Value>) -> AttestResult {
        self.runner.calls.stub(name, value.into())
    }

    /// Replaces `name` with an argument-inspecting substitute until the
    /// current test frame unwinds.
    pub fn mock(
        &mut self,
        name: &str,
        replacement: impl Fn(&[Value]) -> AttestResult<Value> + 'static,
    ) -> AttestResult {
        self.runner.calls.mock(name, Rc::new(replacement))
    }

    /// Dispatches a call through the mockable table.
    pub fn call(&mut self, name: &str, args: &[Value]) -> AttestResult<Value> {
        self.runner.calls.call(name, args)
    }

    /// Invokes another registered test or suite from inside this one.
    ///
    /// A test invoked this way runs its body directly: no fixtures are
    /// applied and no new mock scope opens, and a failure propagates into
    /// this frame rather than being recorded separately.
    pub fn invoke(&mut self, name: &str) -> AttestResult<Report> {
        self.runner.invoke(name)
    }

    /// Convenience constructor for the failure signal, for assertion
    /// vocabularies that do not build an [`AssertionFailure`] themselves.
    pub fn fail(&self, description: impl Into<String>) -> AttestError {
        AssertionFailure::new(description).raise()
    }
}

// ============================================================================
// RUNNER - registry + call table + execution state
// ============================================================================

/// The execution engine. Owns the definition registry and the mockable call
/// table; `invoke` is the only execution entry point.
#[derive(Default)]
pub struct Runner {
    registry: Registry,
    calls: CallTable,
    /// Number of test frames on the stack. Depth above zero means "nested
    /// inside an already-running test": no fixtures, no new mock scope.
    depth: usize,
    /// Suites currently being iterated, for the cycle guard.
    active_suites: Vec<String>,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The mockable call table, exposed read-only for inspection.
    pub fn calls(&self) -> &CallTable {
        &self.calls
    }

    // ------------------------------------------------------------------
    // Definition surface
    // ------------------------------------------------------------------

    /// Registers a test, overwriting any previous definition under the same
    /// name. When the builder asked to run on define, the test runs
    /// immediately (standalone) and its report is returned.
    pub fn define_test(&mut self, test: TestBuilder) -> AttestResult<Option<TestReport>> {
        let def = test.build();
        let name = def.name.clone();
        let run = def.run_on_define;
        self.registry.define(Definition::Test(Rc::new(def)));
        if !run {
            return Ok(None);
        }
        match self.invoke(&name)? {
            Report::Test(report) => Ok(Some(report)),
            Report::Suite(_) => Ok(None),
        }
    }

    /// Registers a suite and its inline children, depth-first, children
    /// before the suite itself. Returns the reports of every unit that ran
    /// on define, in definition order.
    pub fn define_suite(&mut self, suite: SuiteBuilder) -> AttestResult<Vec<Report>> {
        let mut pending = Vec::new();
        self.register_suite(suite, &mut pending)?;
        let mut ran = Vec::new();
        for name in pending {
            ran.push(self.invoke(&name)?);
        }
        Ok(ran)
    }

    /// Appends an existing named test or suite to a suite's children.
    pub fn add_child(&mut self, suite: &str, child: &str) -> AttestResult {
        self.registry.add_child(suite, child)
    }

    /// Installs a base binding in the mockable call table.
    pub fn bind(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> AttestResult<Value> + 'static,
    ) {
        self.calls.bind(name, f);
    }

    /// Dispatches a call through the mockable table.
    pub fn call(&self, name: &str, args: &[Value]) -> AttestResult<Value> {
        self.calls.call(name, args)
    }

    /// Stubs outside a running test are misuse: there is no frame to own
    /// the restoration, so this fails unless a test is currently executing.
    pub fn stub(&mut self, name: &str, value: impl Into<Value>) -> AttestResult {
        self.calls.stub(name, value.into())
    }

    /// See [`Runner::stub`].
    pub fn mock(
        &mut self,
        name: &str,
        replacement: impl Fn(&[Value]) -> AttestResult<Value> + 'static,
    ) -> AttestResult {
        self.calls.mock(name, Rc::new(replacement))
    }

    // ------------------------------------------------------------------
    // Invocation surface
    // ------------------------------------------------------------------

    /// Looks up a test or suite by name and runs it.
    pub fn invoke(&mut self, name: &str) -> AttestResult<Report> {
        let def = self.registry.lookup(name)?.clone();
        match def {
            Definition::Test(test) => self
                .run_test(test, CallSite::Standalone)
                .map(Report::Test),
            Definition::Suite(suite) => self.run_suite(suite).map(Report::Suite),
        }
    }

    /// Runs a test as a member of an explicitly named suite, overriding any
    /// recorded owner for fixture purposes. Invoking a suite this way is the
    /// same as [`Runner::invoke`]: suites always carry their own fixtures.
    pub fn invoke_in(&mut self, name: &str, suite: &str) -> AttestResult<Report> {
        let suite_def = self.registry.lookup_suite(suite)?;
        let def = self.registry.lookup(name)?.clone();
        match def {
            Definition::Test(test) => self
                .run_test(
                    test,
                    CallSite::Member {
                        suite: suite_def,
                        wrap_applied: false,
                    },
                )
                .map(Report::Test),
            Definition::Suite(nested) => self.run_suite(nested).map(Report::Suite),
        }
    }

    // ------------------------------------------------------------------
    // Test execution
    // ------------------------------------------------------------------

    fn run_test(&mut self, test: Rc<TestDef>, call_site: CallSite) -> AttestResult<TestReport> {
        // Nested inside an already-running test: the body runs directly.
        // Re-applying fixtures would double-execute setup/teardown, and the
        // open mock scope already owns any replacements the body installs.
        if self.depth > 0 {
            self.depth += 1;
            let result = self.run_body(&test);
            self.depth -= 1;
            result?;
            return Ok(TestReport {
                name: test.name.clone(),
                annotation: test.annotation.clone(),
                outcome: Outcome::Pass,
            });
        }

        let (suite, wrap_applied) = match call_site {
            CallSite::Member {
                suite,
                wrap_applied,
            } => (Some(suite), wrap_applied),
            CallSite::Standalone => {
                let owner = test.owner.borrow().clone();
                let suite = owner.and_then(|name| self.registry.lookup_suite(&name).ok());
                (suite, false)
            }
        };

        self.depth += 1;
        let mark = self.calls.open_scope();
        let result = match &suite {
            Some(s) => {
                let t = Rc::clone(&test);
                let s2 = Rc::clone(s);
                let chain: Inner<'_> =
                    Box::new(move |rn: &mut Runner| rn.suite_member_chain(&t, &s2));
                match (&s.fixtures.wrap, wrap_applied) {
                    (Some(wrap), false) => {
                        let wrap = Rc::clone(wrap);
                        let unit = s.name.clone();
                        self.through(&unit, &wrap, chain)
                    }
                    _ => chain(self),
                }
            }
            None => self.test_chain(&test),
        };
        self.calls.close_scope(mark);
        self.depth -= 1;

        Ok(TestReport {
            name: test.name.clone(),
            annotation: test.annotation.clone(),
            outcome: Outcome::from_chain(result),
        })
    }

    /// Suite layer around a member test: suite setup, suite fixture, then
    /// the test's own chain, then suite teardown.
    fn suite_member_chain(&mut self, test: &Rc<TestDef>, suite: &Rc<SuiteDef>) -> AttestResult {
        let t = Rc::clone(test);
        let inner: Inner<'_> = Box::new(move |rn: &mut Runner| rn.test_chain(&t));
        self.bracketed(&suite.name, &suite.fixtures, inner)
    }

    /// The test's own layer: test setup, test fixture, body, test teardown.
    fn test_chain(&mut self, test: &Rc<TestDef>) -> AttestResult {
        let t = Rc::clone(test);
        let inner: Inner<'_> = Box::new(move |rn: &mut Runner| rn.run_body(&t));
        self.bracketed(&test.name, &test.fixtures, inner)
    }

    /// Runs one setup/fixture/teardown layer around `inner`. Teardown runs
    /// even when setup or anything inside it raised; the first error wins.
    fn bracketed(&mut self, unit: &str, fixtures: &Fixtures, inner: Inner<'_>) -> AttestResult {
        let main = match &fixtures.setup {
            Some(hook) => self.run_hook(unit, hook),
            None => Ok(()),
        };
        let main = match main {
            Ok(()) => match &fixtures.fixture {
                Some(wrapper) => {
                    let wrapper = Rc::clone(wrapper);
                    self.through(unit, &wrapper, inner)
                }
                None => inner(self),
            },
            Err(err) => Err(err),
        };
        let teardown = match &fixtures.teardown {
            Some(hook) => self.run_hook(unit, hook),
            None => Ok(()),
        };
        main.and(teardown)
    }

    /// Threads `inner` through a `fixture`/`wrap` procedure. The enclosed
    /// code's own result takes precedence over the procedure's; a procedure
    /// that never invokes its continuation yields `FixtureNeverInvoked`.
    fn through(&mut self, unit: &str, wrapper: &Wrapper, inner: Inner<'_>) -> AttestResult {
        let mut continuation = Continuation::new(inner);
        let wrapper = Rc::clone(wrapper);
        let wrap_result = {
            let mut ctx = TestContext {
                runner: self,
                unit: unit.to_string(),
            };
            catch_unwind(AssertUnwindSafe(|| wrapper(&mut ctx, &mut continuation)))
                .unwrap_or_else(|payload| Err(panic_error(payload)))
        };
        match continuation.into_outcome() {
            Some(inner_result) => inner_result.and(wrap_result),
            None => {
                wrap_result?;
                Err(AttestError::FixtureNeverInvoked {
                    unit: unit.to_string(),
                })
            }
        }
    }

    fn run_hook(&mut self, unit: &str, hook: &Hook) -> AttestResult {
        let hook = Rc::clone(hook);
        let mut ctx = TestContext {
            runner: self,
            unit: unit.to_string(),
        };
        catch_unwind(AssertUnwindSafe(|| hook(&mut ctx)))
            .unwrap_or_else(|payload| Err(panic_error(payload)))
    }

    fn run_body(&mut self, test: &Rc<TestDef>) -> AttestResult {
        let body = Rc::clone(&test.body);
        let mut ctx = TestContext {
            runner: self,
            unit: test.name.clone(),
        };
        catch_unwind(AssertUnwindSafe(|| body(&mut ctx)))
            .unwrap_or_else(|payload| Err(panic_error(payload)))
    }

    // ------------------------------------------------------------------
    // Suite execution
    // ------------------------------------------------------------------

    fn run_suite(&mut self, suite: Rc<SuiteDef>) -> AttestResult<SuiteReport> {
        // Cycle guard: a suite already on the active run stack is treated
        // as handled, not as an error.
        if self.suite_is_active(&suite.name) {
            return Ok(SuiteReport {
                name: suite.name.clone(),
                annotation: suite.annotation.clone(),
                children: Vec::new(),
                error: None,
            });
        }
        self.active_suites.push(suite.name.clone());

        let mut children: Vec<Report> = Vec::new();
        let chain_result = {
            let s = Rc::clone(&suite);
            let reports = &mut children;
            let iterate: Inner<'_> =
                Box::new(move |rn: &mut Runner| rn.run_children(&s, reports));
            match &suite.fixtures.wrap {
                Some(wrap) => {
                    let wrap = Rc::clone(wrap);
                    self.through(&suite.name, &wrap, iterate)
                }
                None => iterate(self),
            }
        };

        self.active_suites.pop();
        Ok(SuiteReport {
            name: suite.name.clone(),
            annotation: suite.annotation.clone(),
            children,
            error: chain_result.err().map(|e| e.to_string()),
        })
    }

    /// Iterates a suite's children in declared order. A child's failure or
    /// error never stops its siblings; it is recorded and iteration
    /// continues.
    fn run_children(&mut self, suite: &Rc<SuiteDef>, reports: &mut Vec<Report>) -> AttestResult {
        let names: Vec<String> = suite.children.borrow().clone();
        for child_name in names {
            let def = self.registry.lookup(&child_name).ok().cloned();
            match def {
                Some(Definition::Test(test)) => {
                    let report = self.run_test(
                        test,
                        CallSite::Member {
                            suite: Rc::clone(suite),
                            wrap_applied: true,
                        },
                    )?;
                    reports.push(Report::Test(report));
                }
                Some(Definition::Suite(nested)) => {
                    if self.suite_is_active(&nested.name) {
                        continue;
                    }
                    let report = self.run_suite(nested)?;
                    reports.push(Report::Suite(report));
                }
                None => {
                    // Declared by name but never defined; record and move on.
                    let message = AttestError::NotFound {
                        name: child_name.clone(),
                    }
                    .to_string();
                    reports.push(Report::Test(TestReport {
                        name: child_name,
                        annotation: None,
                        outcome: Outcome::Error { message },
                    }));
                }
            }
        }
        Ok(())
    }

    fn suite_is_active(&self, name: &str) -> bool {
        self.active_suites.iter().any(|n| n == name)
    }

    // ------------------------------------------------------------------
    // Registration internals
    // ------------------------------------------------------------------

    fn register_suite(
        &mut self,
        builder: SuiteBuilder,
        pending: &mut Vec<String>,
    ) -> AttestResult<String> {
        let SuiteBuilder {
            name,
            annotation,
            fixtures,
            run_on_define,
            children,
        } = builder;

        let mut child_names: Vec<String> = Vec::new();
        for child in children {
            let child_name = match child {
                Child::Test(tb) => {
                    let def = tb.build();
                    {
                        let mut owner = def.owner.borrow_mut();
                        if owner.is_none() {
                            *owner = Some(name.clone());
                        }
                    }
                    let child_name = def.name.clone();
                    if def.run_on_define {
                        pending.push(child_name.clone());
                    }
                    self.registry.define(Definition::Test(Rc::new(def)));
                    child_name
                }
                Child::Suite(sb) => self.register_suite(sb, pending)?,
                // Forward references are allowed here: children are resolved
                // against the registry at run time, so a name declared before
                // its definition simply has to exist by the time the suite
                // runs.
                Child::Named(n) => n,
            };
            if !child_names.contains(&child_name) {
                child_names.push(child_name);
            }
        }

        if run_on_define {
            pending.push(name.clone());
        }
        self.registry.define(Definition::Suite(Rc::new(SuiteDef {
            name: name.clone(),
            annotation,
            fixtures,
            children: RefCell::new(child_names),
            run_on_define,
        })));
        Ok(name)
    }
}

fn panic_error(payload: Box<dyn std::any::Any + Send>) -> AttestError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    };
    AttestError::Unexpected {
        message: format!("panic: {}", message),
    }
}
