#![forbid(unsafe_code)]

//! The [`Interpreter`] adapter.
//!
//! An `Interpreter` wraps one service of an external state machine and keeps
//! a reactive shadow of its state:
//!
//! ```text
//! service push ──► Shadow::merge ──► Selector / Watcher / Reducer reads
//!                       ▲
//! send_ui ──► UiThread ─┘ (sampled into the `ui_thread` slice)
//! ```
//!
//! The service owns transitions, context changes and timers. The adapter
//! only delegates to it and mirrors what it pushes.
//!
//! # Invariants
//!
//! 1. The shadow always holds a complete snapshot; the initial one is
//!    synthesized before the service pushes anything.
//! 2. Pushes are merged shallowly, in delivery order, and are visible to any
//!    read issued after the push returns.
//! 3. The shadow and the UI thread belong to exactly one interpreter; forks
//!    made by [`Interpreter::provide_options`] get their own.
//! 4. After [`Interpreter::dispose`], every operation returns
//!    [`InterpreterError::Disposed`] and every selector read panics.

mod lifecycle;
mod shadow;
pub mod ui_thread;
mod views;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use shade_core::{
    InterpreterConfig, Listener, Machine, Mode, Service, ServiceSubscription, Snapshot,
    SnapshotPatch, StateValue, UiEvent, WorkingStatus, normalize_path,
};

use crate::config::{ShadowConfig, UiGate};
use crate::error::{InterpreterError, Result};
use crate::reactive::Subscription;
use crate::selector::{Liveness, Reducer, Selector, Source, Watcher};

pub use lifecycle::Lifecycle;
use shadow::Shadow;
pub use ui_thread::{UiSignal, UiThread, UiValue, UiWrite};

/// Snapshot shape of machine `M` with UI values `U`.
pub type MachineSnapshot<M, U> = Snapshot<<M as Machine>::Context, <M as Machine>::Event, U>;

/// Reactive adapter over one service of machine `M`.
///
/// `U` is the type of UI thread values; JSON values by default.
pub struct Interpreter<M: Machine, U: UiValue = serde_json::Value> {
    machine: Rc<M>,
    config: InterpreterConfig<M::Context, M::PrivateContext>,
    settings: ShadowConfig,
    service: RefCell<Option<Rc<M::Service>>>,
    subscription: RefCell<Option<Box<dyn ServiceSubscription>>>,
    shadow: Shadow<M::Context, M::Event, U>,
    ui_thread: UiThread<U>,
    options: RefCell<Option<M::Options>>,
    lifecycle: Cell<Lifecycle>,
}

impl<M: Machine, U: UiValue> fmt::Debug for Interpreter<M, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("lifecycle", &self.lifecycle.get())
            .field("mode", &self.config.mode)
            .field("ui_thread", &self.ui_thread)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<M: Machine, U: UiValue> Interpreter<M, U> {
    /// Interpret `machine` with `config` and start shadowing it.
    ///
    /// The service is created but not started.
    #[must_use]
    pub fn new(machine: M, config: InterpreterConfig<M::Context, M::PrivateContext>) -> Self {
        Self::build(Rc::new(machine), config, ShadowConfig::default())
    }

    /// Like [`new`](Self::new), registering an initial set of UI signals.
    #[must_use]
    pub fn with_ui<K: Into<String>>(
        machine: M,
        config: InterpreterConfig<M::Context, M::PrivateContext>,
        ui: impl IntoIterator<Item = (K, U)>,
    ) -> Self {
        let interpreter = Self::new(machine, config);
        for (key, initial) in ui {
            interpreter.ui_thread.register(key, initial);
        }
        interpreter.refresh_ui();
        interpreter
    }

    /// Replace the adapter settings.
    #[must_use]
    pub fn with_settings(mut self, settings: ShadowConfig) -> Self {
        self.settings = settings;
        self
    }

    fn build(
        machine: Rc<M>,
        config: InterpreterConfig<M::Context, M::PrivateContext>,
        settings: ShadowConfig,
    ) -> Self {
        let service = Rc::new(machine.interpret(&config));
        let liveness = Liveness::new();
        let ui_thread = UiThread::new(liveness.clone());
        let shadow = Shadow::new(service.context(), service.initial_value(), None, liveness);

        let listener: Listener<M::Context, M::Event> = {
            let shadow = shadow.clone();
            let ui_thread = ui_thread.clone();
            Rc::new(move |patch: &SnapshotPatch<M::Context, M::Event>| {
                shadow.merge(patch.clone(), ui_thread.sample());
            })
        };
        let subscription = service.subscribe(listener);

        tracing::debug!(message = "interpreter.create", mode = ?config.mode, exact = config.exact);

        Self {
            machine,
            config,
            settings,
            service: RefCell::new(Some(service)),
            subscription: RefCell::new(Some(subscription)),
            shadow,
            ui_thread,
            options: RefCell::new(None),
            lifecycle: Cell::new(Lifecycle::Idle),
        }
    }

    /// The live service, or `Disposed` naming `operation`.
    fn live_service(&self, operation: &'static str) -> Result<Rc<M::Service>> {
        self.service
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or(InterpreterError::disposed(operation))
    }

    fn refresh_ui(&self) {
        self.shadow.refresh_ui(self.ui_thread.sample());
    }

    // ── Delegation ───────────────────────────────────────────────────

    /// Send `event` to the service.
    ///
    /// Errors from the service are returned unchanged.
    pub fn send(&self, event: M::Event) -> Result<()> {
        let service = self.live_service("send")?;
        let span = tracing::debug_span!("interpreter.send", event = ?event);
        let _guard = span.enter();
        service.send(event)?;
        Ok(())
    }

    /// The wrapped service, for operations the adapter does not mirror.
    pub fn service(&self) -> Result<Rc<M::Service>> {
        self.live_service("service")
    }

    // ── UI thread ────────────────────────────────────────────────────

    /// Register a UI signal, or return the one already under `key`.
    ///
    /// Re-registering ignores `initial`.
    pub fn register_ui_signal(&self, key: impl Into<String>, initial: U) -> Result<UiSignal<U>> {
        if !self.shadow.is_alive() {
            return Err(InterpreterError::disposed("register_ui_signal"));
        }
        let key = key.into();
        let (signal, created) = self.ui_thread.register(key.clone(), initial);
        tracing::debug!(message = "ui.register", key = %key, created);
        if created {
            self.refresh_ui();
        }
        Ok(signal)
    }

    /// Register several UI signals at once, with the same semantics as
    /// [`register_ui_signal`](Self::register_ui_signal).
    pub fn add_ui_options<K: Into<String>>(
        &self,
        ui: impl IntoIterator<Item = (K, U)>,
    ) -> Result<()> {
        for (key, initial) in ui {
            self.register_ui_signal(key, initial)?;
        }
        Ok(())
    }

    /// Write to a UI signal, bypassing the machine entirely.
    ///
    /// Returns the value written, or `None` when no signal is registered
    /// under the event's key (or when the UI gate holds the event back).
    pub fn send_ui(&self, event: UiEvent<U>) -> Result<Option<U>> {
        if !self.shadow.is_alive() {
            return Err(InterpreterError::disposed("send_ui"));
        }
        if self.settings.ui_gate == UiGate::WhenRunning && !self.is_running() {
            tracing::debug!(message = "ui.send.gated", key = %event.key);
            return Ok(None);
        }

        let key = event.key.clone();
        let Some(write) = self.ui_thread.write(event) else {
            tracing::debug!(message = "ui.send.unregistered", key = %key);
            return Ok(None);
        };
        // The shadow takes the new value before anyone is notified.
        self.refresh_ui();
        let written = write.publish();
        tracing::debug!(message = "ui.send", key = %key);
        Ok(Some(written))
    }

    /// Current value of a UI signal, read from its cell.
    #[must_use]
    pub fn ui_value(&self, key: &str) -> Option<U> {
        self.ui_thread.signal(key).map(|signal| signal.get())
    }

    #[must_use]
    pub fn ui_keys(&self) -> Vec<String> {
        self.ui_thread.keys()
    }

    /// Whether any UI signal has been registered.
    #[must_use]
    pub fn is_ui_used(&self) -> bool {
        self.ui_thread.is_used()
    }

    // ── Selectors ────────────────────────────────────────────────────

    fn source(&self) -> Source<MachineSnapshot<M, U>> {
        self.shadow.source()
    }

    /// One-shot read of the current snapshot.
    fn read<R>(&self, f: impl FnOnce(&MachineSnapshot<M, U>) -> R) -> R {
        assert!(
            self.shadow.is_alive(),
            "interpreter read after it was disposed"
        );
        self.shadow.with(f)
    }

    /// Memoized projection of the snapshot, compared with `PartialEq`.
    #[must_use]
    pub fn state<T: Clone + PartialEq + 'static>(
        &self,
        accessor: impl Fn(&MachineSnapshot<M, U>) -> T + 'static,
    ) -> Selector<T> {
        self.source().state(accessor)
    }

    /// Memoized projection of the snapshot under a caller equality.
    #[must_use]
    pub fn state_by<T: Clone + 'static>(
        &self,
        accessor: impl Fn(&MachineSnapshot<M, U>) -> T + 'static,
        equals: impl Fn(&T, &T) -> bool + 'static,
    ) -> Selector<T> {
        self.source().state_by(accessor, equals)
    }

    #[must_use]
    pub fn watcher<T: Clone + 'static>(
        &self,
        accessor: impl Fn(&MachineSnapshot<M, U>) -> T + 'static,
    ) -> Watcher<MachineSnapshot<M, U>, T> {
        self.source().watcher(accessor)
    }

    #[must_use]
    pub fn reducer<T: Clone + 'static>(
        &self,
        accessor: impl Fn(&MachineSnapshot<M, U>) -> T + 'static,
    ) -> Reducer<MachineSnapshot<M, U>, T> {
        self.source().reducer(accessor)
    }

    /// Reducer over the machine context.
    #[must_use]
    pub fn context(&self) -> Reducer<MachineSnapshot<M, U>, M::Context> {
        self.reducer(|s| s.context.clone())
    }

    /// Reducer over the sampled UI values; empty when none are registered.
    #[must_use]
    pub fn ui(&self) -> Reducer<MachineSnapshot<M, U>, BTreeMap<String, U>> {
        self.reducer(|s| s.ui_thread.clone().unwrap_or_default())
    }

    /// Current state value.
    ///
    /// # Panics
    ///
    /// Panics after [`dispose`](Self::dispose).
    #[must_use]
    pub fn value(&self) -> StateValue {
        self.read(|s| s.value.clone())
    }

    /// Current status reported by the service.
    ///
    /// # Panics
    ///
    /// Panics after [`dispose`](Self::dispose).
    #[must_use]
    pub fn status(&self) -> WorkingStatus {
        self.read(|s| s.status)
    }

    /// Current tags, if the service reported any.
    ///
    /// # Panics
    ///
    /// Panics after [`dispose`](Self::dispose).
    #[must_use]
    pub fn tags(&self) -> Option<Vec<String>> {
        self.read(|s| s.tags.clone())
    }

    /// Clone of the whole current snapshot.
    ///
    /// # Panics
    ///
    /// Panics after [`dispose`](Self::dispose).
    #[must_use]
    pub fn snapshot(&self) -> MachineSnapshot<M, U> {
        self.read(|s| s.clone())
    }

    /// Call `callback` with the snapshot after every change.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&MachineSnapshot<M, U>) + 'static) -> Subscription {
        self.source().observable().subscribe(callback)
    }

    // ── Configuration ────────────────────────────────────────────────

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    #[must_use]
    pub fn config(&self) -> &InterpreterConfig<M::Context, M::PrivateContext> {
        &self.config
    }

    #[must_use]
    pub fn settings(&self) -> &ShadowConfig {
        &self.settings
    }

    /// Every addressable state path of the machine, in the configured
    /// delimiter.
    #[must_use]
    pub fn all_values(&self) -> Vec<String> {
        self.machine
            .state_paths()
            .iter()
            .map(|path| normalize_path(path, &self.settings.delimiter))
            .collect()
    }

    /// The option bag returned by the last [`add_options`](Self::add_options).
    #[must_use]
    pub fn options(&self) -> Option<M::Options> {
        self.options.borrow().clone()
    }

    fn is_running(&self) -> bool {
        self.shadow.is_alive() && self.status().is_running()
    }
}

#[cfg(test)]
mod tests {
    use shade_harness::fixtures::{fetcher_config, fetcher_machine};

    use super::*;

    #[test]
    fn one_shot_reads_leave_no_subscriber_slots() {
        let interpreter: Interpreter<_> = Interpreter::new(fetcher_machine(), fetcher_config());
        interpreter.start().unwrap();
        interpreter.send("FETCH".into()).unwrap();
        let baseline = interpreter.shadow.slot_count();

        for _ in 0..10_000 {
            let _ = interpreter.value();
            let _ = interpreter.status();
            let _ = interpreter.tags();
            let _ = interpreter.snapshot();
            assert!(interpreter.has_tags(&["busy"]));
            assert!(interpreter.matches(&["working/fetch/pending"]));
            assert!(interpreter.contains(&["ui/busy"]));
        }

        assert_eq!(interpreter.shadow.slot_count(), baseline);
    }

    #[test]
    fn dropped_watchers_release_their_slots() {
        let interpreter: Interpreter<_> = Interpreter::new(fetcher_machine(), fetcher_config());
        interpreter.start().unwrap();
        let baseline = interpreter.shadow.slot_count();

        for _ in 0..1_000 {
            let watcher = interpreter.watcher(|s| s.status);
            assert!(watcher.read().is_running());
        }

        assert!(interpreter.shadow.slot_count() <= baseline + 1);
    }
}
