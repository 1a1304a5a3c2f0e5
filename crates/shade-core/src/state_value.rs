#![forbid(unsafe_code)]

//! State values and their decomposition into addressable paths.
//!
//! A state value is either the name of a single active state or a nested
//! record describing which children of compound/parallel states are active:
//!
//! ```
//! use shade_core::state_value::{StateValue, decompose};
//!
//! let value = StateValue::compound([(
//!     "working",
//!     StateValue::compound([
//!         ("fetch", StateValue::from("idle")),
//!         ("ui", StateValue::from("idle")),
//!     ]),
//! )]);
//!
//! assert_eq!(
//!     decompose(&value),
//!     vec![
//!         "working",
//!         "working/fetch",
//!         "working/fetch/idle",
//!         "working/ui",
//!         "working/ui/idle",
//!     ]
//! );
//! ```
//!
//! # Invariants
//!
//! 1. Decomposition is depth-first and emits every prefix before its
//!    extensions, so parents precede children.
//! 2. Sibling order follows key order (compound values are ordered maps),
//!    making decomposition deterministic.
//! 3. Raw paths are joined with [`RAW_SEPARATOR`]; normalization rewrites
//!    every occurrence of it to the configured delimiter.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Delimiter used in normalized paths unless configured otherwise.
pub const DEFAULT_DELIMITER: &str = "/";

/// Separator used while walking a state value, before normalization.
pub const RAW_SEPARATOR: char = '.';

/// Descriptor of the active state(s) of a machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// A single active atomic state.
    Atomic(String),
    /// Active children of compound or parallel states, keyed by state name.
    Compound(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Create an atomic state value.
    #[must_use]
    pub fn atomic(name: impl Into<String>) -> Self {
        Self::Atomic(name.into())
    }

    /// Create a compound state value from `(name, child)` pairs.
    #[must_use]
    pub fn compound<K: Into<String>>(children: impl IntoIterator<Item = (K, StateValue)>) -> Self {
        Self::Compound(
            children
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Name of the state when atomic.
    #[must_use]
    pub fn as_atomic(&self) -> Option<&str> {
        match self {
            Self::Atomic(name) => Some(name),
            Self::Compound(_) => None,
        }
    }

    /// Whether this value is a single atomic state.
    #[must_use]
    pub fn is_atomic(&self) -> bool {
        matches!(self, Self::Atomic(_))
    }
}

impl Default for StateValue {
    fn default() -> Self {
        Self::Compound(BTreeMap::new())
    }
}

impl From<&str> for StateValue {
    fn from(name: &str) -> Self {
        Self::Atomic(name.to_owned())
    }
}

impl From<String> for StateValue {
    fn from(name: String) -> Self {
        Self::Atomic(name)
    }
}

impl PartialEq<str> for StateValue {
    fn eq(&self, other: &str) -> bool {
        self.as_atomic() == Some(other)
    }
}

impl PartialEq<&str> for StateValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_atomic() == Some(*other)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atomic(name) => f.write_str(name),
            Self::Compound(children) => {
                f.write_str("{")?;
                for (i, (key, child)) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {child}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Decompose a state value into raw, `.`-joined paths.
#[must_use]
pub fn decompose_raw(value: &StateValue) -> Vec<String> {
    let mut out = Vec::new();
    walk(value, None, &mut out);
    out
}

fn walk(value: &StateValue, prefix: Option<&str>, out: &mut Vec<String>) {
    let join = |segment: &str| match prefix {
        Some(prefix) => format!("{prefix}{RAW_SEPARATOR}{segment}"),
        None => segment.to_owned(),
    };

    match value {
        StateValue::Atomic(name) => out.push(join(name)),
        StateValue::Compound(children) => {
            for (key, child) in children {
                let path = join(key);
                out.push(path.clone());
                walk(child, Some(&path), out);
            }
        }
    }
}

/// Rewrite every raw separator of `entry` to `delimiter`.
#[must_use]
pub fn normalize_path(entry: &str, delimiter: &str) -> String {
    entry.replace(RAW_SEPARATOR, delimiter)
}

/// Decompose and normalize with an explicit delimiter.
#[must_use]
pub fn decompose_with(value: &StateValue, delimiter: &str) -> Vec<String> {
    decompose_raw(value)
        .iter()
        .map(|entry| normalize_path(entry, delimiter))
        .collect()
}

/// Decompose and normalize with [`DEFAULT_DELIMITER`].
#[must_use]
pub fn decompose(value: &StateValue) -> Vec<String> {
    decompose_with(value, DEFAULT_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher_working() -> StateValue {
        StateValue::compound([(
            "working",
            StateValue::compound([
                ("fetch", StateValue::from("idle")),
                ("ui", StateValue::from("input")),
            ]),
        )])
    }

    #[test]
    fn atomic_decomposes_to_itself() {
        assert_eq!(decompose(&StateValue::from("idle")), vec!["idle"]);
    }

    #[test]
    fn compound_emits_every_prefix() {
        assert_eq!(
            decompose_raw(&fetcher_working()),
            vec![
                "working",
                "working.fetch",
                "working.fetch.idle",
                "working.ui",
                "working.ui.input",
            ]
        );
    }

    #[test]
    fn custom_delimiter_is_applied() {
        let paths = decompose_with(&fetcher_working(), "::");
        assert!(paths.contains(&"working::fetch::idle".to_owned()));
        assert!(paths.iter().all(|p| !p.contains('.')));
    }

    #[test]
    fn empty_compound_has_no_paths() {
        assert!(decompose(&StateValue::default()).is_empty());
    }

    #[test]
    fn compares_with_str() {
        assert_eq!(StateValue::from("final"), "final");
        assert_ne!(fetcher_working(), "working");
    }

    #[test]
    fn display_formats_nested_values() {
        assert_eq!(
            fetcher_working().to_string(),
            "{working: {fetch: idle, ui: input}}"
        );
    }

    #[test]
    fn serde_untagged_shape() {
        let json = serde_json::to_value(fetcher_working()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "working": { "fetch": "idle", "ui": "input" } })
        );
        let back: StateValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, fetcher_working());
    }
}
