#![forbid(unsafe_code)]

//! Core: the boundary between Shade and an external state-machine interpreter.
//!
//! Shade never evaluates transitions itself. This crate describes what it
//! consumes from the interpreter it wraps: state values and their
//! decomposition into addressable paths, the snapshot shape pushed on every
//! change, lifecycle statuses, and the [`Machine`]/[`Service`] traits an
//! interpreter implements to be driven by `shade-runtime`.

pub mod config;
pub mod error;
pub mod event;
pub mod machine;
pub mod snapshot;
pub mod state_value;
pub mod status;

pub use config::{InterpreterConfig, Mode};
pub use error::ServiceError;
pub use event::{EventObject, UiEvent, UiPayload};
pub use machine::{Listener, Machine, Service, ServiceSubscription};
pub use snapshot::{Snapshot, SnapshotPatch};
pub use state_value::{
    DEFAULT_DELIMITER, StateValue, decompose, decompose_raw, decompose_with, normalize_path,
};
pub use status::WorkingStatus;
