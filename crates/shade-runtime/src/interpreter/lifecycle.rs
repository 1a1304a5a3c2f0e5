#![forbid(unsafe_code)]

//! Lifecycle delegation, option rebinding and teardown.
//!
//! ```text
//! Idle ──start──► Started ◄──resume── Paused
//!                    │  └────pause─────►  │
//!                    └──stop──► Stopped ◄─┘
//! any ──dispose──► Disposed (terminal)
//! ```

use std::rc::Rc;

use shade_core::{Machine, Service};

use super::{Interpreter, UiValue};
use crate::error::{InterpreterError, Result};

/// Local lifecycle of an [`Interpreter`], independent of the status the
/// service reports in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Idle,
    Started,
    Paused,
    Stopped,
    Disposed,
}

impl Lifecycle {
    /// Whether the service has been started and not stopped since.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Started | Self::Paused)
    }
}

impl<M: Machine, U: UiValue> Interpreter<M, U> {
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    /// Start the service.
    pub fn start(&self) -> Result<()> {
        let service = self.live_service("start")?;
        service.start()?;
        self.lifecycle.set(Lifecycle::Started);
        tracing::debug!(message = "interpreter.start");
        Ok(())
    }

    /// Pause the service. The shadow and the UI thread keep working.
    pub fn pause(&self) -> Result<()> {
        let service = self.live_service("pause")?;
        service.pause()?;
        if self.lifecycle.get() == Lifecycle::Started {
            self.lifecycle.set(Lifecycle::Paused);
        }
        tracing::debug!(message = "interpreter.pause");
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        let service = self.live_service("resume")?;
        service.resume()?;
        if self.lifecycle.get() == Lifecycle::Paused {
            self.lifecycle.set(Lifecycle::Started);
        }
        tracing::debug!(message = "interpreter.resume");
        Ok(())
    }

    /// Stop the service, then read the shadow once so every push the stop
    /// produced is settled before returning.
    pub fn stop(&self) -> Result<()> {
        let service = self.live_service("stop")?;
        service.stop()?;
        self.lifecycle.set(Lifecycle::Stopped);
        let version = self.shadow.flush();
        tracing::debug!(message = "interpreter.stop", version);
        Ok(())
    }

    /// Merge `patch` into the service options and return the merged bag.
    ///
    /// The UI slice of the shadow is re-sampled afterwards.
    pub fn add_options(&self, patch: M::Options) -> Result<M::Options> {
        let service = self.live_service("add_options")?;
        let merged = service.add_options(patch);
        *self.options.borrow_mut() = Some(merged.clone());
        self.refresh_ui();
        tracing::debug!(message = "interpreter.options");
        Ok(merged)
    }

    /// Fork: a new interpreter of the same machine and configuration, with
    /// its own service and a fresh shadow, with `patch` applied.
    ///
    /// `self` is left untouched.
    pub fn provide_options(&self, patch: M::Options) -> Result<Self> {
        if !self.shadow.is_alive() {
            return Err(InterpreterError::disposed("provide_options"));
        }
        let fork = Self::build(
            Rc::clone(&self.machine),
            self.config.clone(),
            self.settings.clone(),
        );
        fork.add_options(patch)?;
        tracing::debug!(message = "interpreter.fork");
        Ok(fork)
    }

    /// Like [`provide_options`](Self::provide_options), also registering
    /// `ui` on the fork.
    pub fn provide_options_with_ui<K: Into<String>>(
        &self,
        patch: M::Options,
        ui: impl IntoIterator<Item = (K, U)>,
    ) -> Result<Self> {
        let fork = self.provide_options(patch)?;
        fork.add_ui_options(ui)?;
        Ok(fork)
    }

    /// Tear the interpreter down.
    ///
    /// Stops the service if it is running, detaches from and disposes it,
    /// releases the UI thread and the options, and invalidates the shadow.
    /// Teardown always completes; a failing stop is logged, not returned.
    /// Calling `dispose` again is a no-op.
    pub fn dispose(&self) {
        if self.lifecycle.get() == Lifecycle::Disposed {
            tracing::trace!(message = "interpreter.dispose.repeat");
            return;
        }

        let service = self.service.borrow_mut().take();
        if let Some(service) = service {
            if self.lifecycle.get().is_active()
                && let Err(error) = service.stop()
            {
                tracing::warn!(message = "interpreter.dispose.stop_failed", %error);
            }
            if let Some(mut subscription) = self.subscription.borrow_mut().take() {
                subscription.unsubscribe();
            }
            service.dispose();
        }

        self.ui_thread.clear();
        self.options.borrow_mut().take();
        self.shadow.release();
        self.lifecycle.set(Lifecycle::Disposed);
        tracing::debug!(message = "interpreter.dispose");
    }

    /// Asynchronous form of [`dispose`](Self::dispose).
    pub async fn dispose_async(&self) {
        self.dispose();
    }
}

impl<M: Machine, U: UiValue> Drop for Interpreter<M, U> {
    fn drop(&mut self) {
        self.dispose();
    }
}
