// =============================================================================
// Snapshot Sinks — where periodic horizon rows go
// =============================================================================
//
// The engine never persists anything itself.  Every `snapshot_every` samples
// a horizon hands a `HorizonSnapshot` to the injected sink; reporting and
// storage collaborators implement `SnapshotSink`.
// =============================================================================

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::types::{HorizonId, HorizonSnapshot};

/// Receives periodic snapshot rows.  Called with the horizon's lock held, so
/// implementations should return quickly.
pub trait SnapshotSink: Send + Sync {
    fn record(&self, snapshot: &HorizonSnapshot);
}

/// Discards every row.
#[derive(Debug, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn record(&self, _snapshot: &HorizonSnapshot) {}
}

/// Logs every row as a JSON document at `debug` level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl SnapshotSink for TracingSink {
    fn record(&self, snapshot: &HorizonSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(row) => debug!(horizon = snapshot.horizon, row = %row, "horizon snapshot"),
            Err(e) => warn!(horizon = snapshot.horizon, error = %e, "failed to serialise snapshot"),
        }
    }
}

/// Keeps rows in memory, oldest first.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<HorizonSnapshot>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<HorizonSnapshot> {
        self.rows.lock().clone()
    }

    pub fn rows_for(&self, horizon: HorizonId) -> Vec<HorizonSnapshot> {
        self.rows
            .lock()
            .iter()
            .filter(|r| r.horizon == horizon)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

impl SnapshotSink for MemorySink {
    fn record(&self, snapshot: &HorizonSnapshot) {
        self.rows.lock().push(snapshot.clone());
    }
}
