//! Scoped function replacement: the indirection table behind `stub`/`mock`.
//!
//! Mockable call sites never call their target directly; they dispatch by
//! name through a [`CallTable`]. Replacing a binding pushes an undo record,
//! and closing the scope opened at the test frame pops and applies the
//! records in reverse, so every name resolves back to its pre-test binding no
//! matter how the test exited. Installing a replacement while no scope is
//! open is misuse, not a test outcome.

use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::{AttestError, AttestResult};
use crate::value::Value;

/// A callable reachable through the indirection table.
pub type Callable = Rc<dyn Fn(&[Value]) -> AttestResult<Value>>;

/// An opaque undo-log position, taken when a test frame opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeMark(usize);

struct UndoRecord {
    name: String,
    /// The binding in force before the replacement; `None` means the name
    /// was unbound and restoration removes it.
    prior: Option<Callable>,
}

/// Name -> current implementation, plus the undo log for the open test
/// scope.
#[derive(Default)]
pub struct CallTable {
    bindings: HashMap<String, Callable>,
    undo: Vec<UndoRecord>,
    scope_open: bool,
}

impl CallTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a base binding. Not undo-logged: this is the production
    /// implementation the table dispatches to when no replacement is active.
    pub fn bind(&mut self, name: impl Into<String>, f: impl Fn(&[Value]) -> AttestResult<Value> + 'static) {
        self.bindings.insert(name.into(), Rc::new(f));
    }

    /// Dispatches a call through the table.
    pub fn call(&self, name: &str, args: &[Value]) -> AttestResult<Value> {
        let f = self
            .bindings
            .get(name)
            .ok_or_else(|| AttestError::Unbound {
                name: name.to_string(),
            })?
            .clone();
        f(args)
    }

    /// Replaces `name` with a callable that ignores its arguments and always
    /// yields `value`, for the remainder of the open test scope.
    pub fn stub(&mut self, name: &str, value: Value) -> AttestResult {
        self.install(name, "stub", Rc::new(move |_args: &[Value]| Ok(value.clone())))
    }

    /// Replaces `name` with an arbitrary substitute that receives the call's
    /// arguments, for the remainder of the open test scope.
    pub fn mock(&mut self, name: &str, replacement: Callable) -> AttestResult {
        self.install(name, "mock", replacement)
    }

    fn install(&mut self, name: &str, operation: &str, replacement: Callable) -> AttestResult {
        if !self.scope_open {
            return Err(AttestError::Misuse {
                operation: operation.to_string(),
                target: name.to_string(),
            });
        }
        let prior = self.bindings.insert(name.to_string(), replacement);
        self.undo.push(UndoRecord {
            name: name.to_string(),
            prior,
        });
        Ok(())
    }

    /// Opens the restoration scope for a test frame and returns the mark to
    /// close it with. Only one scope is ever open: nested test invocation
    /// does not open another, so replacements installed by a nested body
    /// belong to the outermost running test.
    pub fn open_scope(&mut self) -> ScopeMark {
        self.scope_open = true;
        ScopeMark(self.undo.len())
    }

    /// Pops every undo record down to `mark` and applies them in reverse
    /// (most recently installed restored first), then closes the scope.
    pub fn close_scope(&mut self, mark: ScopeMark) {
        while self.undo.len() > mark.0 {
            let Some(record) = self.undo.pop() else { break };
            match record.prior {
                Some(f) => {
                    self.bindings.insert(record.name, f);
                }
                None => {
                    self.bindings.remove(&record.name);
                }
            }
        }
        self.scope_open = false;
    }

    pub fn scope_is_open(&self) -> bool {
        self.scope_open
    }

    /// True when no restoration records are pending. Holds before every test
    /// starts and after every test ends.
    pub fn is_clean(&self) -> bool {
        self.undo.is_empty()
    }
}
