#![forbid(unsafe_code)]

//! Shade public facade crate.
//!
//! Shade shadows an external state-machine interpreter with memoized,
//! reactive selectors and a separate UI-value channel.

pub use shade_core::{
    EventObject, InterpreterConfig, Machine, Mode, Service, ServiceError, Snapshot, SnapshotPatch,
    StateValue, UiEvent, WorkingStatus,
};
pub use shade_runtime::{
    Interpreter, InterpreterError, Lifecycle, Reducer, Result, Selector, ShadowConfig, UiGate,
    UiSignal, Watcher,
};

pub mod prelude {
    pub use shade_core as core;
    #[cfg(feature = "harness")]
    pub use shade_harness as harness;
    pub use shade_runtime as runtime;

    pub use crate::{Interpreter, InterpreterConfig, Machine, Service, UiEvent};
}
