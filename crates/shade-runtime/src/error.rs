#![forbid(unsafe_code)]

use shade_core::ServiceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InterpreterError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    /// An operation was attempted on a disposed interpreter.
    #[error("`{operation}` called on a disposed interpreter")]
    Disposed { operation: &'static str },

    /// Error raised by the external interpreter, passed through as-is.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl InterpreterError {
    #[must_use]
    pub const fn disposed(operation: &'static str) -> Self {
        Self::Disposed { operation }
    }

    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed { .. })
    }
}
