//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

/// Append-only event log that test bodies and fixtures write to, used to
/// observe execution order from the outside.
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// Asserts the log contains exactly `expected`, in order.
pub fn assert_events(log: &Log, expected: &[&str]) {
    let actual = log.events();
    assert_eq!(
        actual,
        expected.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        "event order mismatch"
    );
}
