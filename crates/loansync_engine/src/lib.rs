//! # loansync engine
//!
//! Keeps a local replica of a remote object collection consistent with its
//! source.
//!
//! This crate provides:
//! - Field-level patch engine over JSON trees
//! - Per-object reconciler (create / patch / refetch / delete / ignore)
//! - Paginated bulk importer that seeds the replica
//! - Event dispatcher that fans webhook batches out to the reconciler
//! - Remote source abstraction with a GraphQL-over-HTTP adapter
//! - Sync status and the coordinator that sequences import and live mode
//!
//! ## Architecture
//!
//! ```text
//! BulkImporter ──► ObjectStore ◄── Reconciler ◄── EventDispatcher ◄── batch
//!      │                              │
//!      └──────────► RemoteSource ◄────┘ (refetch)
//! ```
//!
//! ## Key Invariants
//!
//! - A stored object is either a verified-exact patch or a fresh remote copy
//! - A failed patch is never written; the object is refetched instead
//! - Reconciliations of the same object id never interleave
//! - The engine never retries; a failed batch is redelivered by the sender

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod dispatcher;
mod error;
mod graphql;
mod importer;
mod locks;
pub mod object;
mod patch;
mod reconciler;
mod remote;
mod status;

pub use config::SyncConfig;
pub use coordinator::{StartupReport, SyncCoordinator};
pub use dispatcher::{BatchHandler, BatchSummary, EventDispatcher};
pub use error::{PatchError, PatchResult, SyncError, SyncResult};
pub use graphql::{GraphQlNames, GraphQlRemote, HttpClient, HttpError};
pub use importer::{BulkImporter, ImportSummary};
pub use locks::{KeyGuard, KeyedLocks};
pub use patch::{apply_field_change, apply_field_changes, json_type, Accessor};
pub use reconciler::{ReconcileOutcome, Reconciler, RefetchReason};
pub use remote::{MockRemote, Page, PageRequest, RemoteSource};
pub use status::SyncStatus;
