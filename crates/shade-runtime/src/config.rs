#![forbid(unsafe_code)]

//! Adapter settings.
//!
//! Environment variables take precedence over defaults:
//!
//! | variable               | meaning                                    |
//! |------------------------|--------------------------------------------|
//! | `SHADE_PATH_DELIMITER` | delimiter of decomposed state paths        |
//! | `SHADE_UI_GATE`        | `always` or `running`, see [`UiGate`]       |

use std::env;

use shade_core::DEFAULT_DELIMITER;

/// Whether `send_ui` depends on the machine's running status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiGate {
    /// UI events are applied regardless of machine status.
    #[default]
    Always,
    /// UI events are dropped unless the machine is running.
    WhenRunning,
}

impl UiGate {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "always" | "ungated" => Some(Self::Always),
            "running" | "when-running" | "gated" => Some(Self::WhenRunning),
            _ => None,
        }
    }
}

/// Settings of an [`Interpreter`](crate::Interpreter), shared by its forks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowConfig {
    /// Delimiter substituted into decomposed state paths.
    pub delimiter: String,
    pub ui_gate: UiGate,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_owned(),
            ui_gate: UiGate::Always,
        }
    }
}

impl ShadowConfig {
    /// Defaults overridden by `SHADE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    ///
    /// Unparseable or empty values are ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("SHADE_PATH_DELIMITER")
            && !val.is_empty()
        {
            config.delimiter = val;
        }
        if let Some(val) = lookup("SHADE_UI_GATE")
            && let Some(gate) = UiGate::parse(&val)
        {
            config.ui_gate = gate;
        }

        config
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    #[must_use]
    pub fn ui_gate(mut self, gate: UiGate) -> Self {
        self.ui_gate = gate;
        self
    }
}
