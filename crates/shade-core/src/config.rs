#![forbid(unsafe_code)]

//! Interpreter configuration handed to [`Machine::interpret`](crate::Machine::interpret).

use serde::{Deserialize, Serialize};

/// Execution mode of the external interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    /// Errors inside actions and guards abort instead of being reported.
    Strict,
}

/// Configuration used to instantiate a service from a machine definition.
///
/// The adapter keeps its own copy so that forks can be interpreted from the
/// same machine with the same configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterConfig<C, P> {
    /// Public context the machine starts from.
    pub context: C,
    /// Private context, never exposed through snapshots.
    pub private_context: P,
    pub mode: Mode,
    /// Whether delays are honored exactly rather than coalesced.
    pub exact: bool,
}

impl<C, P> InterpreterConfig<C, P> {
    /// Create a configuration in [`Mode::Normal`], not exact.
    #[must_use]
    pub fn new(context: C, private_context: P) -> Self {
        Self {
            context,
            private_context,
            mode: Mode::Normal,
            exact: false,
        }
    }

    /// Set the execution mode.
    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the exactness flag.
    #[must_use]
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }
}

impl<C: Default, P: Default> Default for InterpreterConfig<C, P> {
    fn default() -> Self {
        Self::new(C::default(), P::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let config = InterpreterConfig::new(5u32, ()).mode(Mode::Strict).exact(true);
        assert_eq!(config.context, 5);
        assert_eq!(config.mode, Mode::Strict);
        assert!(config.exact);
    }

    #[test]
    fn default_is_normal_and_inexact() {
        let config: InterpreterConfig<u32, ()> = InterpreterConfig::default();
        assert_eq!(config.mode, Mode::Normal);
        assert!(!config.exact);
    }
}
