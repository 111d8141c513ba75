//! CLI command implementations.

pub mod apply_batch;
pub mod get;
pub mod inspect;
pub mod purge;
pub mod reset_status;

use loansync_engine::{Page, PageRequest, RemoteSource, SyncConfig, SyncError, SyncResult, SyncStatus};
use loansync_storage::{DataDir, JsonFileStore, SingletonStore, StoreResult};
use serde_json::Value;
use std::sync::Arc;

/// Directory under the data root that holds the loan documents.
pub const LOANS_COLLECTION: &str = "loans";

/// An opened data directory. Holds the writer lock while alive, so the CLI
/// refuses to run next to a live service.
pub struct Replica {
    /// The locked data directory.
    pub dir: DataDir,
    /// Loan documents.
    pub loans: Arc<JsonFileStore>,
    /// Sync status singleton.
    pub status: SingletonStore<SyncStatus, JsonFileStore<SyncStatus>>,
}

impl Replica {
    /// Opens the data directory named by `config`.
    pub fn open(config: &SyncConfig) -> StoreResult<Self> {
        let dir = DataDir::open(&config.data_directory)?;
        let loans = Arc::new(dir.object_store(LOANS_COLLECTION, config.cache_capacity)?);
        let status = dir.status_store();
        Ok(Self { dir, loans, status })
    }
}

/// Remote source used offline: every fetch fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineRemote;

impl OfflineRemote {
    fn unavailable() -> SyncError {
        SyncError::transport_fatal("no remote configured offline")
    }
}

impl RemoteSource for OfflineRemote {
    fn fetch_object(&self, _id: &str) -> SyncResult<Option<Value>> {
        Err(Self::unavailable())
    }

    fn fetch_page(&self, _request: &PageRequest) -> SyncResult<Page> {
        Err(Self::unavailable())
    }

    fn total_count(&self) -> SyncResult<u64> {
        Err(Self::unavailable())
    }
}
