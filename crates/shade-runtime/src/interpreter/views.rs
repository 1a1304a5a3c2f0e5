#![forbid(unsafe_code)]

//! Derived views: state-value matching, tags, and path selection.

use serde::Serialize;
use serde_json::Value;
use shade_core::{Machine, decompose_with};

use super::{Interpreter, UiValue};
use crate::selector::Selector;

impl<M: Machine, U: UiValue> Interpreter<M, U> {
    /// Decomposed, delimiter-normalized paths of the current state value.
    ///
    /// # Panics
    ///
    /// Panics after [`dispose`](Self::dispose).
    #[must_use]
    pub fn dps(&self) -> Vec<String> {
        self.read(|s| decompose_with(&s.value, &self.settings.delimiter))
    }

    /// Whether every requested path is one of the decomposed paths.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, values: &[S]) -> bool {
        let dps = self.dps();
        values
            .iter()
            .all(|value| dps.iter().any(|dp| dp == value.as_ref()))
    }

    /// Whether every requested value is a substring of at least one
    /// decomposed path.
    #[must_use]
    pub fn contains<S: AsRef<str>>(&self, values: &[S]) -> bool {
        let dps = self.dps();
        values
            .iter()
            .all(|value| dps.iter().any(|dp| dp.contains(value.as_ref())))
    }

    /// Whether every requested tag is attached to the current state.
    ///
    /// `false` when the service has not reported any tags.
    #[must_use]
    pub fn has_tags<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        self.read(|s| s.has_tags(tags))
    }
}

impl<M, U> Interpreter<M, U>
where
    M: Machine,
    M::Context: Serialize,
    M::Event: Serialize,
    U: UiValue + Serialize,
{
    /// Memoized selection of a dotted path (`"context.count"`,
    /// `"uiThread.loading"`) in the serialized snapshot.
    ///
    /// A path that does not resolve reads as `None`; the empty path selects
    /// the whole snapshot.
    #[must_use]
    pub fn select(&self, path: &str) -> Selector<Option<Value>> {
        let pointer = to_pointer(path);
        self.state(move |snapshot| {
            serde_json::to_value(snapshot)
                .ok()
                .and_then(|value| value.pointer(&pointer).cloned())
        })
    }
}

/// Convert a dotted path into a JSON pointer.
fn to_pointer(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    path.split('.')
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::to_pointer;

    #[test]
    fn dotted_paths_become_pointers() {
        assert_eq!(to_pointer(""), "");
        assert_eq!(to_pointer("context"), "/context");
        assert_eq!(to_pointer("uiThread.loading"), "/uiThread/loading");
        assert_eq!(to_pointer("context.a/b~c"), "/context/a~1b~0c");
    }
}
