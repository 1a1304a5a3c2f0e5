#![forbid(unsafe_code)]

//! Runtime: a reactive shadow of an external state-machine interpreter.
//!
//! The [`Interpreter`] adapter subscribes to a service's pushes, keeps one
//! canonical snapshot in a reactive cell, and hands out memoized selectors
//! over it. UI-only values live on a separate, faster "UI thread" that never
//! goes through the machine.
//!
//! # Example
//!
//! ```ignore
//! let interpreter = Interpreter::new(machine, InterpreterConfig::new(ctx, ()));
//! let iterator = interpreter.context().select(|c| c.iterator);
//! interpreter.start()?;
//! assert_eq!(iterator.get(), 0);
//! ```

pub mod config;
pub mod error;
pub mod interpreter;
pub mod reactive;
pub mod selector;

pub use config::{ShadowConfig, UiGate};
pub use error::{InterpreterError, Result};
pub use interpreter::{Interpreter, Lifecycle, MachineSnapshot, UiSignal, UiValue, UiWrite};
pub use selector::{Reducer, Selector, Watcher};
