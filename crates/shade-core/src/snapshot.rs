#![forbid(unsafe_code)]

//! The merged read-model of a machine and the partial pushes that update it.
//!
//! # Invariants
//!
//! 1. A [`Snapshot`] is always complete: every top-level field holds a value.
//! 2. [`Snapshot::merge`] is shallow. Fields present in the patch replace the
//!    current ones; absent fields are retained untouched.
//! 3. Patches never carry the `ui_thread` slice; it is owned by the adapter
//!    and refreshed from its own registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::EventObject;
use crate::state_value::StateValue;
use crate::status::WorkingStatus;

/// Canonical snapshot of a machine at a point in time.
///
/// `C` is the machine context, `E` its event type and `U` the type of UI
/// thread values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<C, E, U> {
    pub context: C,
    pub value: StateValue,
    pub status: WorkingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub event: EventObject<E>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_thread: Option<BTreeMap<String, U>>,
}

impl<C, E, U> Snapshot<C, E, U> {
    /// The snapshot of a machine that has not been started yet.
    #[must_use]
    pub fn initial(context: C, value: StateValue) -> Self {
        Self {
            context,
            value,
            status: WorkingStatus::Idle,
            tags: None,
            event: EventObject::Init,
            ui_thread: None,
        }
    }

    /// Shallow-merge `patch` into this snapshot.
    pub fn merge(&mut self, patch: SnapshotPatch<C, E>) {
        let SnapshotPatch {
            context,
            value,
            status,
            tags,
            event,
        } = patch;

        if let Some(context) = context {
            self.context = context;
        }
        if let Some(value) = value {
            self.value = value;
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(tags) = tags {
            self.tags = Some(tags);
        }
        if let Some(event) = event {
            self.event = event;
        }
    }

    /// Merge into a copy, leaving `self` untouched.
    #[must_use]
    pub fn merged(&self, patch: SnapshotPatch<C, E>) -> Self
    where
        C: Clone,
        E: Clone,
        U: Clone,
    {
        let mut next = self.clone();
        next.merge(patch);
        next
    }

    /// Whether every tag in `tags` is attached to the current state.
    ///
    /// A snapshot without a `tags` field has no tags at all, so this is
    /// `false` even for an empty request.
    #[must_use]
    pub fn has_tags<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        let Some(current) = self.tags.as_ref() else {
            return false;
        };
        tags.iter()
            .all(|tag| current.iter().any(|t| t == tag.as_ref()))
    }
}

/// A possibly partial snapshot pushed by the external interpreter.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPatch<C, E> {
    pub context: Option<C>,
    pub value: Option<StateValue>,
    pub status: Option<WorkingStatus>,
    pub tags: Option<Vec<String>>,
    pub event: Option<EventObject<E>>,
}

impl<C, E> Default for SnapshotPatch<C, E> {
    fn default() -> Self {
        Self {
            context: None,
            value: None,
            status: None,
            tags: None,
            event: None,
        }
    }
}

impl<C, E> SnapshotPatch<C, E> {
    /// An empty patch; merging it changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<StateValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: WorkingStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn event(mut self, event: EventObject<E>) -> Self {
        self.event = Some(event);
        self
    }

    /// Whether merging this patch would leave a snapshot unchanged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.context.is_none()
            && self.value.is_none()
            && self.status.is_none()
            && self.tags.is_none()
            && self.event.is_none()
    }
}
