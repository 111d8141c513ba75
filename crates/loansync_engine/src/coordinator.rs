//! Replica lifecycle: seed once, then reconcile live events.

use crate::config::SyncConfig;
use crate::dispatcher::{BatchHandler, BatchSummary, EventDispatcher};
use crate::error::SyncResult;
use crate::importer::{BulkImporter, ImportSummary};
use crate::reconciler::Reconciler;
use crate::remote::RemoteSource;
use crate::status::SyncStatus;
use loansync_protocol::SubscriptionEventsBatch;
use loansync_storage::{ObjectStore, SingletonStore};
use serde_json::Value;
use tracing::info;

/// What [`SyncCoordinator::initialize`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupReport {
    /// A bulk import ran.
    Imported {
        /// Import counters.
        summary: ImportSummary,
        /// Objects in the store afterwards.
        stored: usize,
    },
    /// The replica was already seeded; nothing was fetched.
    AlreadySynced {
        /// Objects in the store.
        stored: usize,
    },
}

/// Owns the replica's collaborators and sequences its lifecycle.
///
/// Incoming batches should only be handed to the coordinator once
/// [`initialize`](Self::initialize) has returned; until then the store may
/// hold an incomplete snapshot.
pub struct SyncCoordinator<S, R, T>
where
    T: ObjectStore<SyncStatus>,
{
    config: SyncConfig,
    importer: BulkImporter<S, R>,
    dispatcher: EventDispatcher<S, R>,
    status: SingletonStore<SyncStatus, T>,
}

impl<S, R, T> SyncCoordinator<S, R, T>
where
    S: ObjectStore<Value> + Clone,
    R: RemoteSource + Clone,
    T: ObjectStore<SyncStatus>,
{
    /// Creates a coordinator. `store` and `remote` are shared handles
    /// (typically `Arc`s) used by both the importer and the reconciler.
    pub fn new(
        config: SyncConfig,
        store: S,
        remote: R,
        status: SingletonStore<SyncStatus, T>,
    ) -> Self {
        let importer = BulkImporter::new(store.clone(), remote.clone())
            .with_total_count_cap(config.total_count_cap);
        let dispatcher =
            EventDispatcher::new(Reconciler::new(store, remote), config.object_type.clone());
        Self {
            config,
            importer,
            dispatcher,
            status,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the object store.
    pub fn store(&self) -> &S {
        self.importer.store()
    }

    /// Returns the event dispatcher.
    pub fn dispatcher(&self) -> &EventDispatcher<S, R> {
        &self.dispatcher
    }

    /// Reads the persisted status; a replica without one is unsynced.
    ///
    /// # Errors
    ///
    /// Returns an error if the status record cannot be read.
    pub fn status(&self) -> SyncResult<SyncStatus> {
        Ok(self.status.read()?.unwrap_or_default())
    }

    /// Seeds the replica if needed.
    ///
    /// A bulk import runs when no import has completed yet, or when `force`
    /// is set (for example because the event subscription is new and
    /// events may have been missed). The synced flag is persisted only
    /// after the import finishes.
    ///
    /// # Errors
    ///
    /// Returns an error if the import or a status write fails.
    pub fn initialize(&self, force: bool) -> SyncResult<StartupReport> {
        let status = self.status()?;
        if status.synced && !force {
            let stored = self.store().count()?;
            info!("Already synced {stored} objects");
            return Ok(StartupReport::AlreadySynced { stored });
        }

        let summary = self
            .importer
            .import(self.config.page_size, self.config.import_limit)?;
        self.status.write(&SyncStatus::synced())?;

        let stored = self.store().count()?;
        info!("Completed initial import of {stored} objects");
        Ok(StartupReport::Imported { summary, stored })
    }

    /// Clears the synced flag so the next start re-imports.
    ///
    /// # Errors
    ///
    /// Returns an error if the status record cannot be removed.
    pub fn reset_status(&self) -> SyncResult<()> {
        self.status.delete()?;
        Ok(())
    }
}

impl<S, R, T> BatchHandler for SyncCoordinator<S, R, T>
where
    S: ObjectStore<Value> + Clone,
    R: RemoteSource + Clone,
    T: ObjectStore<SyncStatus>,
{
    fn handle_batch(&self, batch: &SubscriptionEventsBatch) -> SyncResult<BatchSummary> {
        self.dispatcher.dispatch(batch)
    }
}
