use crate::simulation::Snapshot;
use std::sync::{Arc, Mutex};

/// Coalescing hand-off point between the scheduler (single producer) and an
/// external observer (single consumer).
///
/// The scheduler replaces the slot at every commit; a consumer that falls
/// behind simply sees the latest snapshot — last writer wins, nothing is
/// queued unboundedly.
#[derive(Debug, Default)]
pub struct SnapshotTap {
    slot: Mutex<Option<Arc<Snapshot>>>,
}

impl SnapshotTap {
    /// Creates an empty tap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a snapshot, replacing any unread one.
    pub fn publish(&self, snapshot: Arc<Snapshot>) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(snapshot);
        }
    }

    /// The latest published snapshot, if any. Does not consume it.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}
