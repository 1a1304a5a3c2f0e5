#![forbid(unsafe_code)]

//! Lifecycle status reported by the external interpreter.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status carried in every snapshot.
///
/// The adapter synthesizes [`WorkingStatus::Idle`] for the initial snapshot;
/// every later value comes from the interpreter's pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkingStatus {
    /// Constructed, not started.
    #[default]
    Idle,
    /// Start requested, entry actions running.
    Starting,
    /// Started, no event processed yet.
    Started,
    /// Running and accepting events.
    Working,
    /// Processing an event.
    Sending,
    /// Paused; activities are suspended.
    Paused,
    /// Stopped.
    Stopped,
    /// Reported by the external interpreter after teardown; events are no
    /// longer accepted.
    Busy,
}

impl WorkingStatus {
    /// Whether the interpreter accepts events in this status.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Started | Self::Working | Self::Sending)
    }

    /// Lowercase name, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Working => "working",
            Self::Sending => "sending",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for WorkingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
