#![forbid(unsafe_code)]

//! Events recorded in snapshots and events sent on the UI thread.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// The event that produced a snapshot.
///
/// Snapshots always carry one; the initial snapshot, synthesized before the
/// interpreter pushes anything, carries [`EventObject::Init`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventObject<E> {
    /// Sentinel for the synthesized initial snapshot and for start-up.
    #[default]
    Init,
    /// An event dispatched to the machine.
    Event(E),
}

impl<E> EventObject<E> {
    /// Whether this is the initialization sentinel.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self, Self::Init)
    }

    /// The wrapped machine event, if any.
    #[must_use]
    pub const fn event(&self) -> Option<&E> {
        match self {
            Self::Init => None,
            Self::Event(event) => Some(event),
        }
    }
}

/// Payload of a UI event: a replacement value or an updater over the
/// previous value.
pub enum UiPayload<U> {
    Value(U),
    Update(Rc<dyn Fn(&U) -> U>),
}

impl<U: Clone> Clone for UiPayload<U> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Update(f) => Self::Update(Rc::clone(f)),
        }
    }
}

impl<U: fmt::Debug> fmt::Debug for UiPayload<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Update(_) => f.write_str("Update(..)"),
        }
    }
}

impl<U> UiPayload<U> {
    /// Resolve the payload against the previous value.
    pub fn apply(self, previous: &U) -> U {
        match self {
            Self::Value(value) => value,
            Self::Update(f) => f(previous),
        }
    }
}

/// An event on the UI thread: `key` names the UI signal to write.
#[derive(Debug, Clone)]
pub struct UiEvent<U> {
    pub key: String,
    pub payload: UiPayload<U>,
}

impl<U> UiEvent<U> {
    /// Replace the value of the signal registered under `key`.
    #[must_use]
    pub fn set(key: impl Into<String>, value: U) -> Self {
        Self {
            key: key.into(),
            payload: UiPayload::Value(value),
        }
    }

    /// Derive the next value of the signal from its previous value.
    #[must_use]
    pub fn update(key: impl Into<String>, f: impl Fn(&U) -> U + 'static) -> Self {
        Self {
            key: key.into(),
            payload: UiPayload::Update(Rc::new(f)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_sentinel() {
        let init: EventObject<&str> = EventObject::default();
        assert!(init.is_init());
        assert_eq!(init.event(), None);
        assert_eq!(EventObject::Event("NEXT").event(), Some(&"NEXT"));
    }

    #[test]
    fn payload_value_replaces() {
        let event = UiEvent::set("counter", 7);
        assert_eq!(event.key, "counter");
        assert_eq!(event.payload.apply(&1), 7);
    }

    #[test]
    fn payload_update_sees_previous() {
        let event = UiEvent::update("counter", |n: &i32| n + 1);
        assert_eq!(event.payload.apply(&41), 42);
    }
}
