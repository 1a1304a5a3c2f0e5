#![forbid(unsafe_code)]

//! The running side of a [`ScriptedMachine`](crate::ScriptedMachine).
//!
//! # Invariants
//!
//! 1. Every push is delivered synchronously to every attached listener,
//!    with no internal borrow held, so listeners may call back in.
//! 2. Activities run only on [`ScriptedService::tick`], and only while the
//!    status is [`WorkingStatus::Working`].
//! 3. After [`Service::dispose`] every operation fails with
//!    [`ServiceError::Disposed`] and no further pushes are made.
//!
//! # Failure Modes
//!
//! - An activity or transition naming an action with no implementation is
//!   skipped with a `warn` event.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use shade_core::{
    EventObject, InterpreterConfig, Listener, Mode, Service, ServiceError, ServiceSubscription,
    SnapshotPatch, StateValue, WorkingStatus,
};

use crate::machine::{Definition, ScriptEvent};
use crate::options::ScriptOptions;

type Listeners<C> = RefCell<Vec<(u64, Listener<C, ScriptEvent>)>>;

struct State<C> {
    context: C,
    current: String,
    status: WorkingStatus,
    options: ScriptOptions<C>,
}

/// A deterministic service driven by explicit ticks.
pub struct ScriptedService<C> {
    definition: Rc<Definition<C>>,
    initial_context: C,
    mode: Mode,
    exact: bool,
    state: RefCell<State<C>>,
    listeners: Rc<Listeners<C>>,
    next_listener: Cell<u64>,
    disposed: Cell<bool>,
}

impl<C: Clone + PartialEq + Debug + 'static> ScriptedService<C> {
    pub(crate) fn new(definition: Rc<Definition<C>>, config: &InterpreterConfig<C, ()>) -> Self {
        let state = State {
            context: config.context.clone(),
            current: definition.initial.clone(),
            status: WorkingStatus::Idle,
            options: definition.options.clone(),
        };
        Self {
            initial_context: config.context.clone(),
            mode: config.mode,
            exact: config.exact,
            definition,
            state: RefCell::new(state),
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_listener: Cell::new(0),
            disposed: Cell::new(false),
        }
    }

    /// Run the current state's activities once.
    ///
    /// Returns whether anything ran. Only the context is pushed.
    pub fn tick(&self) -> bool {
        if self.disposed.get() {
            return false;
        }
        let context = {
            let mut state = self.state.borrow_mut();
            if state.status != WorkingStatus::Working {
                return false;
            }
            let Some(spec) = self.definition.state(&state.current) else {
                return false;
            };
            if spec.activities.is_empty() {
                return false;
            }
            let activities = spec.activities.clone();
            run_actions(&mut state, &activities);
            state.context.clone()
        };
        self.emit(SnapshotPatch::new().context(context));
        true
    }

    /// Tick `n` times; returns how many ticks ran an activity.
    pub fn advance(&self, n: usize) -> usize {
        (0..n).filter(|_| self.tick()).count()
    }

    /// Name of the current state.
    #[must_use]
    pub fn current_state(&self) -> String {
        self.state.borrow().current.clone()
    }

    #[must_use]
    pub fn status(&self) -> WorkingStatus {
        self.state.borrow().status
    }

    /// The live context, as the service sees it.
    #[must_use]
    pub fn live_context(&self) -> C {
        self.state.borrow().context.clone()
    }

    #[must_use]
    pub fn options(&self) -> ScriptOptions<C> {
        self.state.borrow().options.clone()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn guard(&self) -> Result<(), ServiceError> {
        if self.disposed.get() {
            Err(ServiceError::Disposed)
        } else {
            Ok(())
        }
    }

    fn full_patch(&self, event: EventObject<ScriptEvent>) -> SnapshotPatch<C, ScriptEvent> {
        let state = self.state.borrow();
        let (value, tags) = match self.definition.state(&state.current) {
            Some(spec) => (spec.value.clone(), spec.tags.clone()),
            None => (StateValue::default(), Vec::new()),
        };
        SnapshotPatch::new()
            .context(state.context.clone())
            .value(value)
            .status(state.status)
            .tags(tags)
            .event(event)
    }

    fn set_status(&self, status: WorkingStatus) {
        self.state.borrow_mut().status = status;
        self.emit(SnapshotPatch::new().status(status));
    }

    fn emit(&self, patch: SnapshotPatch<C, ScriptEvent>) {
        let listeners: Vec<Listener<C, ScriptEvent>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        tracing::trace!(
            message = "scripted.push",
            listeners = listeners.len(),
            context = patch.context.is_some(),
            value = patch.value.is_some(),
            status = patch.status.is_some()
        );
        for listener in listeners {
            listener(&patch);
        }
    }
}

fn run_actions<C>(state: &mut State<C>, names: &[String]) {
    for name in names {
        match state.options.get(name) {
            Some(action) => {
                let next = action(&state.context);
                state.context = next;
            }
            None => tracing::warn!(message = "scripted.missing_action", action = %name),
        }
    }
}

impl<C: Clone + PartialEq + Debug + 'static> Service for ScriptedService<C> {
    type Context = C;
    type Event = ScriptEvent;
    type Options = ScriptOptions<C>;

    fn context(&self) -> C {
        self.initial_context.clone()
    }

    fn initial_value(&self) -> StateValue {
        self.definition
            .state(&self.definition.initial)
            .map(|s| s.value.clone())
            .unwrap_or_default()
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.guard()?;
        {
            let mut state = self.state.borrow_mut();
            if state.status.is_running() {
                return Ok(());
            }
            state.context = self.initial_context.clone();
            state.current = self.definition.initial.clone();
            state.status = WorkingStatus::Working;
            run_actions(&mut state, &self.definition.entry);
        }
        self.emit(self.full_patch(EventObject::Init));
        Ok(())
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.guard()?;
        self.set_status(WorkingStatus::Stopped);
        Ok(())
    }

    fn pause(&self) -> Result<(), ServiceError> {
        self.guard()?;
        let status = self.status();
        if !status.is_running() {
            return Err(ServiceError::NotRunning { status });
        }
        self.set_status(WorkingStatus::Paused);
        Ok(())
    }

    fn resume(&self) -> Result<(), ServiceError> {
        self.guard()?;
        match self.status() {
            WorkingStatus::Paused => {
                self.set_status(WorkingStatus::Working);
                Ok(())
            }
            status if status.is_running() => Ok(()),
            status => Err(ServiceError::NotRunning { status }),
        }
    }

    fn send(&self, event: ScriptEvent) -> Result<(), ServiceError> {
        self.guard()?;
        let status = self.status();
        if !status.is_running() {
            return Err(ServiceError::NotRunning { status });
        }
        if !self.definition.knows_event(&event.kind) {
            return Err(ServiceError::UnknownEvent { name: event.kind });
        }
        {
            let mut state = self.state.borrow_mut();
            let Some(transition) = self
                .definition
                .state(&state.current)
                .and_then(|s| s.on.get(&event.kind))
                .cloned()
            else {
                // Known elsewhere, not handled here.
                return Ok(());
            };
            run_actions(&mut state, &transition.actions);
            state.current = transition.target;
        }
        self.emit(self.full_patch(EventObject::Event(event)));
        Ok(())
    }

    fn subscribe(&self, listener: Listener<C, ScriptEvent>) -> Box<dyn ServiceSubscription> {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push((id, listener));
        Box::new(ScriptedSubscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        })
    }

    fn add_options(&self, patch: ScriptOptions<C>) -> ScriptOptions<C> {
        let mut state = self.state.borrow_mut();
        state.options.merge(patch);
        state.options.clone()
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.listeners.borrow_mut().clear();
        self.state.borrow_mut().status = WorkingStatus::Stopped;
    }
}

struct ScriptedSubscription<C> {
    id: u64,
    listeners: Weak<Listeners<C>>,
}

impl<C> ServiceSubscription for ScriptedSubscription<C> {
    fn unsubscribe(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
        self.listeners = Weak::new();
    }

    fn is_active(&self) -> bool {
        self.listeners
            .upgrade()
            .is_some_and(|l| l.borrow().iter().any(|(id, _)| *id == self.id))
    }
}
