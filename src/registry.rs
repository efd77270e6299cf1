//! Process-wide name registry and suite membership maintenance.
//!
//! The registry is the single source of truth for definitions: every runner
//! holds exactly one, all lookups go through it, and redefinition silently
//! replaces the previous entry (latest definition wins, to support iterative
//! redefinition during development). Entries are never deleted.

use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::{AttestError, AttestResult};
use crate::unit::{SuiteDef, TestDef};

/// A registered definition: either a test or a suite.
#[derive(Debug, Clone)]
pub enum Definition {
    Test(Rc<TestDef>),
    Suite(Rc<SuiteDef>),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Test(t) => &t.name,
            Definition::Suite(s) => &s.name,
        }
    }
}

/// Name -> definition mapping.
#[derive(Debug, Default)]
pub struct Registry {
    defs: HashMap<String, Definition>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a definition, overwriting any previous entry under the same
    /// name.
    pub fn define(&mut self, def: Definition) {
        self.defs.insert(def.name().to_string(), def);
    }

    pub fn lookup(&self, name: &str) -> AttestResult<&Definition> {
        self.defs.get(name).ok_or_else(|| AttestError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Looks up a suite specifically.
    pub fn lookup_suite(&self, name: &str) -> AttestResult<Rc<SuiteDef>> {
        match self.lookup(name)? {
            Definition::Suite(s) => Ok(Rc::clone(s)),
            Definition::Test(_) => Err(AttestError::NotASuite {
                name: name.to_string(),
            }),
        }
    }

    /// Appends an existing definition to a suite's ordered children.
    ///
    /// Re-adding a child already present is a no-op. If the child is a test
    /// with no recorded owner, the suite becomes its owner (first owner
    /// wins; reassignment only happens through an explicit
    /// [`crate::unit::TestBuilder::in_suite`] at definition).
    pub fn add_child(&self, suite: &str, child: &str) -> AttestResult<()> {
        let suite_def = self.lookup_suite(suite)?;
        let child_def = self.lookup(child)?;

        {
            let mut children = suite_def.children.borrow_mut();
            if !children.iter().any(|c| c == child) {
                children.push(child.to_string());
            }
        }

        if let Definition::Test(test) = child_def {
            let mut owner = test.owner.borrow_mut();
            if owner.is_none() {
                *owner = Some(suite.to_string());
            }
        }
        Ok(())
    }
}
