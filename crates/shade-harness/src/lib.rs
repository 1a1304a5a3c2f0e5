#![forbid(unsafe_code)]

//! Test harness and reference fixtures for Shade.
//!
//! [`ScriptedMachine`] is a small, deterministic implementation of the
//! [`Machine`](shade_core::Machine)/[`Service`](shade_core::Service) boundary.
//! Timers are replaced by an explicit [`ScriptedService::tick`], so tests
//! control exactly when "delayed" activities fire.

pub mod fixtures;
pub mod machine;
pub mod options;
pub mod service;

pub use machine::{MachineBuilder, ScriptEvent, ScriptedMachine, StateSpec};
pub use options::{Action, ScriptOptions};
pub use service::ScriptedService;
