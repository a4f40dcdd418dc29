// Latest metrics + identity, and the UID-keyed snapshot served to report requests.
// Writers serialize on a mutex; readers load the published Arc without locking.

use crate::models::{MetricsByName, Snapshot, VolumeIdentity};
use arc_swap::ArcSwap;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Inputs {
    metrics: Arc<MetricsByName>,
    identity: Arc<VolumeIdentity>,
}

pub struct SnapshotStore {
    inputs: Mutex<Inputs>,
    published: ArcSwap<Snapshot>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            inputs: Mutex::new(Inputs::default()),
            published: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    fn lock_inputs(&self) -> MutexGuard<'_, Inputs> {
        // Inputs are replaced wholesale, so a poisoned guard still holds a complete value.
        self.inputs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores the mapping used by the next `replace`. Does not republish.
    pub fn set_identity(&self, identity: VolumeIdentity) {
        self.lock_inputs().identity = Arc::new(identity);
    }

    /// Joins `metrics` against the current identity and swaps the published snapshot.
    pub fn replace(&self, metrics: MetricsByName) -> Arc<Snapshot> {
        let mut inputs = self.lock_inputs();
        let snapshot = Arc::new(Snapshot::resolve(&metrics, &inputs.identity, Utc::now()));
        inputs.metrics = Arc::new(metrics);
        self.published.store(snapshot.clone());
        let dropped = inputs.metrics.len().saturating_sub(snapshot.metrics.len());
        if dropped > 0 {
            tracing::debug!(dropped, "volumes without identity left out of snapshot");
        }
        snapshot
    }

    /// Last published snapshot; never waits on a refresh in progress.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.published.load_full()
    }

    pub fn identity(&self) -> Arc<VolumeIdentity> {
        self.lock_inputs().identity.clone()
    }

    /// Name-keyed metrics from the last `replace`.
    pub fn metrics_by_name(&self) -> Arc<MetricsByName> {
        self.lock_inputs().metrics.clone()
    }
}
