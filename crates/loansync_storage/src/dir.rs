//! Data directory management.
//!
//! This module handles the file system layout of a replica:
//!
//! ```text
//! <data_dir>/
//! ├─ LOCK              # Advisory lock for the single writer
//! ├─ status.json       # Singleton sync status
//! └─ loans/            # One <id>.json document per object
//! ```
//!
//! The replica has exactly one writer, so the LOCK file is held for as long
//! as the [`DataDir`] lives.

use crate::error::{StoreError, StoreResult};
use crate::file::JsonFileStore;
use crate::store::{validate_id, SingletonStore};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";

/// Record id of the sync status singleton.
pub const STATUS_ID: &str = "status";

/// Manages the data directory structure and its writer lock.
///
/// # Example
///
/// ```rust,no_run
/// use loansync_storage::DataDir;
/// use std::path::Path;
///
/// let dir = DataDir::open(Path::new("data"))?;
/// let loans: loansync_storage::JsonFileStore = dir.object_store("loans", 1000)?;
/// # Ok::<(), loansync_storage::StoreError>(())
/// ```
#[derive(Debug)]
pub struct DataDir {
    path: PathBuf,
    _lock_file: File,
}

impl DataDir {
    /// Opens or creates the data directory and takes its exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another process holds the lock,
    /// or an I/O error if the directory cannot be created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        fs::create_dir_all(path)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked {
                path: path.display().to_string(),
            });
        }

        tracing::debug!(path = %path.display(), "Opened data directory");
        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the root of the data directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the directory holding records for `collection`.
    #[must_use]
    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.path.join(collection)
    }

    /// Opens the keyed store for `collection` (e.g. `loans`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidId`] if `collection` is not a plain
    /// directory name.
    pub fn object_store<T>(
        &self,
        collection: &str,
        cache_capacity: usize,
    ) -> StoreResult<JsonFileStore<T>> {
        validate_id(collection)?;
        Ok(JsonFileStore::open(
            &self.collection_path(collection),
            cache_capacity,
        ))
    }

    /// Opens the sync status singleton stored at the directory root.
    #[must_use]
    pub fn status_store<T>(&self) -> SingletonStore<T, JsonFileStore<T>>
    where
        T: Clone + serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
    {
        SingletonStore::new(JsonFileStore::open(&self.path, 1), STATUS_ID)
    }
}
