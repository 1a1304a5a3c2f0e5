#![forbid(unsafe_code)]

//! The shadow: one reactive cell holding the last known snapshot.
//!
//! Pushes from the external interpreter are merged synchronously, in
//! delivery order, so any read issued after the push returns observes it.
//! When UI signals exist, every merge also re-samples them, so a merge never
//! resurrects a UI value older than the last UI write.

use std::collections::BTreeMap;

use shade_core::{Snapshot, SnapshotPatch, StateValue};

use crate::reactive::Observable;
use crate::selector::{Liveness, Source};

pub(crate) struct Shadow<C, E, U> {
    cell: Observable<Snapshot<C, E, U>>,
    liveness: Liveness,
}

impl<C, E, U> Clone for Shadow<C, E, U> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            liveness: self.liveness.clone(),
        }
    }
}

impl<C, E, U> Shadow<C, E, U>
where
    C: Clone + PartialEq + 'static,
    E: Clone + PartialEq + 'static,
    U: Clone + PartialEq + 'static,
{
    /// Seed the shadow with the not-yet-started snapshot.
    pub(crate) fn new(
        context: C,
        value: StateValue,
        ui_thread: Option<BTreeMap<String, U>>,
        liveness: Liveness,
    ) -> Self {
        let mut initial = Snapshot::initial(context, value);
        initial.ui_thread = ui_thread;
        Self {
            cell: Observable::new(initial),
            liveness,
        }
    }

    /// Merge a push. Ignored once the owner has been disposed.
    ///
    /// Returns whether the snapshot changed.
    pub(crate) fn merge(
        &self,
        patch: SnapshotPatch<C, E>,
        ui_thread: Option<BTreeMap<String, U>>,
    ) -> bool {
        if !self.liveness.is_alive() {
            tracing::trace!(message = "shadow.merge.dropped");
            return false;
        }
        let before = self.cell.version();
        self.cell.update(|snapshot| {
            snapshot.merge(patch);
            if ui_thread.is_some() {
                snapshot.ui_thread = ui_thread;
            }
        });
        let version = self.cell.version();
        tracing::trace!(message = "shadow.merge", version, changed = version != before);
        version != before
    }

    /// Replace the `ui_thread` slice with a fresh sample.
    pub(crate) fn refresh_ui(&self, ui_thread: Option<BTreeMap<String, U>>) {
        if !self.liveness.is_alive() {
            return;
        }
        self.cell.update(|snapshot| snapshot.ui_thread = ui_thread);
    }

    /// Read the current snapshot without building a memo.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&Snapshot<C, E, U>) -> R) -> R {
        self.cell.with(f)
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.cell.slot_count()
    }

    pub(crate) fn source(&self) -> Source<Snapshot<C, E, U>> {
        Source::new(self.cell.clone(), self.liveness.clone())
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Read the cell once so nothing is left pending behind a write.
    pub(crate) fn flush(&self) -> u64 {
        self.cell.with(|_| ());
        self.cell.version()
    }

    /// Invalidate the shadow for every selector built from it.
    pub(crate) fn release(&self) {
        self.liveness.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::{EventObject, WorkingStatus};

    type TestShadow = Shadow<u32, &'static str, bool>;

    fn shadow() -> TestShadow {
        Shadow::new(0, StateValue::from("idle"), None, Liveness::new())
    }

    #[test]
    fn seeded_with_initial_snapshot() {
        let shadow = shadow();
        let snap = shadow.source().snapshot().get();
        assert_eq!(snap.status, WorkingStatus::Idle);
        assert!(snap.event.is_init());
        assert_eq!(snap.value, "idle");
    }

    #[test]
    fn merges_in_order() {
        let shadow = shadow();
        let context = shadow.source().state(|s| s.context);
        for n in 1..=3 {
            assert!(shadow.merge(SnapshotPatch::new().context(n), None));
        }
        assert_eq!(context.get(), 3);
    }

    #[test]
    fn merge_resamples_ui() {
        let shadow = shadow();
        let sample = BTreeMap::from([("open".to_owned(), true)]);
        shadow.merge(
            SnapshotPatch::new().event(EventObject::Event("NEXT")),
            Some(sample.clone()),
        );
        let ui = shadow.source().state(|s| s.ui_thread.clone());
        assert_eq!(ui.get(), Some(sample));
    }

    #[test]
    fn merge_without_change_reports_false() {
        let shadow = shadow();
        assert!(!shadow.merge(SnapshotPatch::new().context(0), None));
    }

    #[test]
    fn released_shadow_drops_pushes() {
        let shadow = shadow();
        let before = shadow.flush();
        shadow.release();
        assert!(!shadow.is_alive());
        assert!(!shadow.merge(SnapshotPatch::new().context(9), None));
        assert_eq!(shadow.flush(), before);
    }
}
