#![forbid(unsafe_code)]

//! The UI thread: UI-only signals living beside the machine.
//!
//! Each registered key owns an independent [`Observable`]. Writes go through
//! [`UiThread::write`] only, which the owning interpreter exposes as
//! `send_ui`; callers receive read-only [`UiSignal`] handles.
//!
//! # Invariants
//!
//! 1. Registering a key that already exists returns the existing signal and
//!    discards the new initial value.
//! 2. A registered key is never replaced or removed until the registry is
//!    cleared by its owner's teardown.
//! 3. [`UiThread::sample`] is a copy, never a live alias of the cells.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use shade_core::UiEvent;

use crate::error::{InterpreterError, Result};
use crate::reactive::{Observable, Subscription};
use crate::selector::Liveness;

/// Bounds required of values carried on the UI thread.
pub trait UiValue: Clone + PartialEq + fmt::Debug + 'static {}

impl<T: Clone + PartialEq + fmt::Debug + 'static> UiValue for T {}

/// Read accessor of a registered UI signal.
pub struct UiSignal<U> {
    cell: Observable<U>,
    liveness: Liveness,
}

impl<U> Clone for UiSignal<U> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            liveness: self.liveness.clone(),
        }
    }
}

impl<U: UiValue> fmt::Debug for UiSignal<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiSignal")
            .field("cell", &self.cell)
            .field("alive", &self.liveness.is_alive())
            .finish()
    }
}

impl<U: UiValue> UiSignal<U> {
    /// Current value.
    ///
    /// # Panics
    ///
    /// Panics if the owning interpreter has been disposed.
    #[must_use]
    pub fn get(&self) -> U {
        assert!(
            self.liveness.is_alive(),
            "UI signal read after its interpreter was disposed"
        );
        self.cell.get()
    }

    pub fn try_get(&self) -> Result<U> {
        if !self.liveness.is_alive() {
            return Err(InterpreterError::disposed("read"));
        }
        Ok(self.cell.get())
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.cell.version()
    }

    /// Call `callback` with every new value.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&U) + 'static) -> Subscription {
        self.cell.subscribe(callback)
    }

    /// Whether both accessors read the same cell.
    #[must_use]
    pub fn same_signal(&self, other: &Self) -> bool {
        self.cell.ptr_eq(&other.cell)
    }
}

/// A committed UI write whose subscribers have not been told yet.
///
/// Sampling the registry already observes the new value.
#[must_use = "a UiWrite notifies nobody until it is published"]
pub struct UiWrite<U> {
    cell: Observable<U>,
    value: U,
    changed: bool,
}

impl<U: UiValue> UiWrite<U> {
    #[must_use]
    pub fn value(&self) -> &U {
        &self.value
    }

    /// Notify the signal's subscribers and return the value written.
    pub fn publish(self) -> U {
        if self.changed {
            self.cell.notify();
        }
        self.value
    }
}

/// Registry of UI signals, keyed by name.
///
/// Cloning creates a new handle to the same registry.
pub struct UiThread<U> {
    cells: Rc<RefCell<BTreeMap<String, Observable<U>>>>,
    liveness: Liveness,
}

impl<U> Clone for UiThread<U> {
    fn clone(&self) -> Self {
        Self {
            cells: Rc::clone(&self.cells),
            liveness: self.liveness.clone(),
        }
    }
}

impl<U: UiValue> fmt::Debug for UiThread<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiThread")
            .field("keys", &self.keys())
            .finish()
    }
}

impl<U: UiValue> UiThread<U> {
    #[must_use]
    pub fn new(liveness: Liveness) -> Self {
        Self {
            cells: Rc::new(RefCell::new(BTreeMap::new())),
            liveness,
        }
    }

    /// Register `key` with `initial`, or return the signal already there.
    ///
    /// The boolean is `true` when a new cell was created.
    pub fn register(&self, key: impl Into<String>, initial: U) -> (UiSignal<U>, bool) {
        let mut cells = self.cells.borrow_mut();
        let key = key.into();
        let created = !cells.contains_key(&key);
        let cell = cells
            .entry(key)
            .or_insert_with(|| Observable::new(initial))
            .clone();
        (
            UiSignal {
                cell,
                liveness: self.liveness.clone(),
            },
            created,
        )
    }

    /// The signal registered under `key`, if any.
    #[must_use]
    pub fn signal(&self, key: &str) -> Option<UiSignal<U>> {
        self.cells.borrow().get(key).map(|cell| UiSignal {
            cell: cell.clone(),
            liveness: self.liveness.clone(),
        })
    }

    /// Commit `event` to its signal without notifying the signal's
    /// subscribers yet.
    ///
    /// Returns `None` without touching anything when no signal is registered
    /// under the event's key. The returned [`UiWrite`] must be published.
    pub fn write(&self, event: UiEvent<U>) -> Option<UiWrite<U>> {
        let cell = self.cells.borrow().get(&event.key).cloned()?;
        let next = cell.with(|previous| event.payload.apply(previous));
        let changed = cell.commit(next.clone());
        Some(UiWrite {
            cell,
            value: next,
            changed,
        })
    }

    /// Copy of every current value, or `None` when nothing is registered.
    #[must_use]
    pub fn sample(&self) -> Option<BTreeMap<String, U>> {
        let cells = self.cells.borrow();
        if cells.is_empty() {
            return None;
        }
        Some(
            cells
                .iter()
                .map(|(key, cell)| (key.clone(), cell.get()))
                .collect(),
        )
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.cells.borrow().keys().cloned().collect()
    }

    #[must_use]
    pub fn is_used(&self) -> bool {
        !self.cells.borrow().is_empty()
    }

    /// Drop every cell. Outstanding [`UiSignal`]s keep their last value but
    /// report the owner as disposed through the shared liveness token.
    pub fn clear(&self) {
        self.cells.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn registry() -> UiThread<i32> {
        UiThread::new(Liveness::new())
    }

    #[test]
    fn register_creates_cell() {
        let ui = registry();
        let (signal, created) = ui.register("count", 3);
        assert!(created);
        assert_eq!(signal.get(), 3);
        assert_eq!(ui.keys(), vec!["count"]);
    }

    #[test]
    fn reregister_keeps_first_value() {
        let ui = registry();
        let (first, _) = ui.register("k", 1);
        let (second, created) = ui.register("k", 2);
        assert!(!created);
        assert!(first.same_signal(&second));
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn write_sets_and_updates() {
        let ui = registry();
        let (signal, _) = ui.register("n", 1);
        assert_eq!(ui.write(UiEvent::set("n", 5)).map(UiWrite::publish), Some(5));
        assert_eq!(
            ui.write(UiEvent::update("n", |n| n * 2)).map(UiWrite::publish),
            Some(10)
        );
        assert_eq!(signal.get(), 10);
    }

    #[test]
    fn write_to_unknown_key_is_noop() {
        let ui = registry();
        assert!(ui.write(UiEvent::set("missing", 1)).is_none());
        assert!(!ui.is_used());
        assert_eq!(ui.sample(), None);
    }

    #[test]
    fn sample_is_a_copy() {
        let ui = registry();
        ui.register("a", 1);
        ui.register("b", 2);
        let sample = ui.sample().unwrap();
        let _ = ui.write(UiEvent::set("a", 100)).map(UiWrite::publish);
        assert_eq!(sample.get("a"), Some(&1));
        assert_eq!(ui.sample().unwrap().get("a"), Some(&100));
    }

    #[test]
    fn signal_subscribers_see_writes() {
        let ui = registry();
        let (signal, _) = ui.register("n", 0);
        let last = Rc::new(Cell::new(0));
        let last_clone = Rc::clone(&last);
        let _sub = signal.subscribe(move |v| last_clone.set(*v));
        let write = ui.write(UiEvent::set("n", 4)).unwrap();
        assert_eq!(last.get(), 0);
        assert_eq!(ui.sample().unwrap().get("n"), Some(&4));
        assert_eq!(write.publish(), 4);
        assert_eq!(last.get(), 4);
    }

    #[test]
    fn dead_registry_signals_error() {
        let live = Liveness::new();
        let ui = UiThread::new(live.clone());
        let (signal, _) = ui.register("n", 0);
        live.kill();
        ui.clear();
        assert!(signal.try_get().unwrap_err().is_disposed());
        assert!(ui.signal("n").is_none());
    }
}
