#![forbid(unsafe_code)]

//! Traits implemented by the external state-machine interpreter.
//!
//! Shade drives an interpreter exclusively through these operations. All
//! methods take `&self`: the interpreter is a shared, single-threaded
//! collaborator and owns its own interior mutability, the way a
//! callback-driven runtime does.
//!
//! # Contract
//!
//! - Listeners registered with [`Service::subscribe`] are called
//!   synchronously, in delivery order, every time the service changes.
//! - A listener may call back into the service (a consumer reacting to a
//!   snapshot by sending an event is ordinary).
//! - Errors are reported as [`ServiceError`]; the adapter never wraps or
//!   suppresses them.

use std::fmt::Debug;
use std::rc::Rc;

use crate::config::InterpreterConfig;
use crate::error::ServiceError;
use crate::snapshot::SnapshotPatch;
use crate::state_value::StateValue;

/// Callback receiving every push from a service.
pub type Listener<C, E> = Rc<dyn Fn(&SnapshotPatch<C, E>)>;

/// Handle returned by [`Service::subscribe`].
pub trait ServiceSubscription {
    /// Detach the listener. Calling it again is a no-op.
    fn unsubscribe(&mut self);

    /// Whether the listener is still attached.
    fn is_active(&self) -> bool;
}

/// A machine definition that can be interpreted into running services.
pub trait Machine {
    type Context: Clone + PartialEq + Debug + 'static;
    type PrivateContext: Clone + Debug + 'static;
    type Event: Clone + PartialEq + Debug + 'static;
    /// Behavior implementations (actions, delays, ...) merged by `add_options`.
    type Options: Clone + Debug + Default + 'static;
    type Service: Service<Context = Self::Context, Event = Self::Event, Options = Self::Options>
        + 'static;

    /// Create an independent, not-yet-started service.
    fn interpret(
        &self,
        config: &InterpreterConfig<Self::Context, Self::PrivateContext>,
    ) -> Self::Service;

    /// Every addressable state path of the machine, '.'-joined.
    fn state_paths(&self) -> Vec<String>;
}

/// A running (or runnable) interpreter of a [`Machine`].
pub trait Service {
    type Context;
    type Event;
    type Options;

    /// Context the service was configured with.
    fn context(&self) -> Self::Context;

    /// State value the service starts in.
    fn initial_value(&self) -> StateValue;

    fn start(&self) -> Result<(), ServiceError>;
    fn stop(&self) -> Result<(), ServiceError>;
    fn pause(&self) -> Result<(), ServiceError>;
    fn resume(&self) -> Result<(), ServiceError>;
    fn send(&self, event: Self::Event) -> Result<(), ServiceError>;

    fn subscribe(
        &self,
        listener: Listener<Self::Context, Self::Event>,
    ) -> Box<dyn ServiceSubscription>;

    /// Merge `patch` into the service's option set and return the result.
    fn add_options(&self, patch: Self::Options) -> Self::Options;

    /// Release every resource held by the service.
    fn dispose(&self);
}
