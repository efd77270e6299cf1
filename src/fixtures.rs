//! Fixture slots and the closure types that fill them.
//!
//! A [`Fixtures`] value carries four independent optional slots. `setup` and
//! `teardown` are plain hooks run before and after the wrapped code; `fixture`
//! receives a continuation it must invoke exactly once and so fully encloses
//! the wrapped code; `wrap` has the same shape as `fixture` but is applied
//! once per suite invocation around the whole child iteration, not once per
//! test.
//!
//! Composition order is fixed by the execution engine (see
//! [`crate::runner`]): suite-level slots are outermost, test-level slots are
//! innermost, and teardown always mirrors setup in reverse.

use std::fmt;
use std::rc::Rc;

use crate::errors::AttestResult;
use crate::runner::{Continuation, TestContext};

/// A setup/teardown hook. Runs inside the owning test frame, so it may stub
/// and mock like a test body.
pub type Hook = Rc<dyn Fn(&mut TestContext<'_>) -> AttestResult>;

/// A `fixture`/`wrap` procedure. Receives the continuation for the code it
/// encloses and is responsible for invoking it exactly once.
pub type Wrapper = Rc<dyn Fn(&mut TestContext<'_>, &mut Continuation<'_>) -> AttestResult>;

/// The four fixture slots of a test or suite. Absent `setup`/`teardown`
/// degenerate to no-ops; an absent `fixture`/`wrap` degenerates to a
/// pass-through that simply calls its continuation.
#[derive(Clone, Default)]
pub struct Fixtures {
    pub setup: Option<Hook>,
    pub teardown: Option<Hook>,
    pub fixture: Option<Wrapper>,
    pub wrap: Option<Wrapper>,
}

impl Fixtures {
    pub fn is_empty(&self) -> bool {
        self.setup.is_none()
            && self.teardown.is_none()
            && self.fixture.is_none()
            && self.wrap.is_none()
    }
}

impl fmt::Debug for Fixtures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mark(slot: &Option<impl Sized>) -> &'static str {
            if slot.is_some() {
                "set"
            } else {
                "-"
            }
        }
        f.debug_struct("Fixtures")
            .field("setup", &mark(&self.setup))
            .field("teardown", &mark(&self.teardown))
            .field("fixture", &mark(&self.fixture))
            .field("wrap", &mark(&self.wrap))
            .finish()
    }
}
