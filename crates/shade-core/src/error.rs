#![forbid(unsafe_code)]

use thiserror::Error;

/// Failure reported by the external interpreter.
///
/// The adapter passes these through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("service is not running (status: {status})")]
    NotRunning { status: crate::WorkingStatus },

    #[error("service has been disposed")]
    Disposed,

    #[error("unknown event: {name}")]
    UnknownEvent { name: String },

    #[error("rejected: {reason}")]
    Rejected { reason: String },
}

impl ServiceError {
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}
