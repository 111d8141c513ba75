//! Replica sync status.

use serde::{Deserialize, Serialize};

/// Process-wide sync state, persisted as a singleton record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Whether a bulk import has completed into this replica.
    #[serde(default)]
    pub synced: bool,
}

impl SyncStatus {
    /// Status of a replica that has completed its bulk import.
    #[must_use]
    pub fn synced() -> Self {
        Self { synced: true }
    }
}
