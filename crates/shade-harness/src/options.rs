#![forbid(unsafe_code)]

//! Named action implementations, merged by name.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// An action: computes the next context from the current one.
pub type Action<C> = Rc<dyn Fn(&C) -> C>;

/// The option bag of a scripted machine.
pub struct ScriptOptions<C> {
    actions: BTreeMap<String, Action<C>>,
}

impl<C> Clone for ScriptOptions<C> {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.clone(),
        }
    }
}

impl<C> Default for ScriptOptions<C> {
    fn default() -> Self {
        Self {
            actions: BTreeMap::new(),
        }
    }
}

impl<C> fmt::Debug for ScriptOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptOptions")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> ScriptOptions<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the action called `name`.
    #[must_use]
    pub fn action(mut self, name: impl Into<String>, f: impl Fn(&C) -> C + 'static) -> Self {
        self.actions.insert(name.into(), Rc::new(f));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Action<C>> {
        self.actions.get(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    /// Merge `other` into `self`; actions in `other` win.
    pub fn merge(&mut self, other: Self) {
        self.actions.extend(other.actions);
    }
}
