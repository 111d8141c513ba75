//! JSON-file object store for persistent storage.

use crate::cache::LruCache;
use crate::error::StoreResult;
use crate::store::{validate_id, ObjectStore};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Extension of durable record files.
const RECORD_EXTENSION: &str = "json";

/// A directory of JSON documents, one `<id>.json` file per object.
///
/// # Durability
///
/// `write` serializes to a uniquely named temporary file in the same
/// directory, calls `File::sync_all()`, renames it over the record and
/// fsyncs the directory. A crash leaves either the old or the new document,
/// never a torn one.
///
/// # Caching
///
/// Reads go through a bounded [`LruCache`]. Writes update the cache only
/// after the file is durable, so the cache never holds a value that is not
/// also on disk. Once a rename or removal has reached the directory the
/// cached entry is dropped, even if the following directory sync fails.
///
/// # Thread Safety
///
/// The store can be shared across threads. Directory creation is
/// idempotent and temporary file names are unique, so concurrent writes to
/// different ids never interfere.
///
/// # Example
///
/// ```no_run
/// use loansync_storage::{JsonFileStore, ObjectStore};
/// use std::path::Path;
///
/// let store: JsonFileStore = JsonFileStore::open(Path::new("data/loans"), 1000);
/// store.write("loan-1", &serde_json::json!({"id": "loan-1"})).unwrap();
/// ```
#[derive(Debug)]
pub struct JsonFileStore<T = serde_json::Value> {
    path: PathBuf,
    cache: Mutex<LruCache<T>>,
    dir_sync: fn(&Path) -> io::Result<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    /// Opens a store rooted at `path` with a cache of `cache_capacity`
    /// entries.
    ///
    /// The directory is created lazily on the first write.
    pub fn open(path: &Path, cache_capacity: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            cache: Mutex::new(LruCache::new(cache_capacity)),
            dir_sync: sync_directory,
            _marker: PhantomData,
        }
    }

    /// Returns the directory holding the records.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns the path of the record file for `id`.
    #[must_use]
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.path.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    /// Lists the ids of all durable records, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read. A directory that
    /// does not exist yet holds no records.
    pub fn ids(&self) -> StoreResult<Vec<String>> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if validate_id(stem).is_ok() {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn temp_path(&self, id: &str) -> PathBuf {
        self.path
            .join(format!(".{id}.{}.tmp", uuid::Uuid::new_v4().simple()))
    }

    fn sync_directory(&self) -> StoreResult<()> {
        (self.dir_sync)(&self.path)?;
        Ok(())
    }

    #[cfg(test)]
    fn with_dir_sync(mut self, dir_sync: fn(&Path) -> io::Result<()>) -> Self {
        self.dir_sync = dir_sync;
        self
    }
}

/// Syncs a directory so renames and removals in it are durable.
#[cfg(unix)]
fn sync_directory(path: &Path) -> io::Result<()> {
    File::open(path)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> io::Result<()> {
    // NTFS journals metadata; directory handles cannot be fsynced
    Ok(())
}

impl<T> ObjectStore<T> for JsonFileStore<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    fn read(&self, id: &str) -> StoreResult<Option<T>> {
        validate_id(id)?;
        if let Some(value) = self.cache.lock().get(id) {
            return Ok(Some(value.clone()));
        }

        let bytes = match fs::read(self.record_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value: T = serde_json::from_slice(&bytes)?;
        self.cache.lock().insert(id.to_string(), value.clone());
        Ok(Some(value))
    }

    fn write(&self, id: &str, value: &T) -> StoreResult<()> {
        validate_id(id)?;
        fs::create_dir_all(&self.path)?;

        let data = serde_json::to_vec_pretty(value)?;
        let temp_path = self.temp_path(id);
        let result = (|| -> StoreResult<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
            drop(file);
            fs::rename(&temp_path, self.record_path(id))?;
            Ok(())
        })();
        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        // The new document is visible on disk from here on
        self.cache.lock().remove(id);
        self.sync_directory()?;

        self.cache.lock().insert(id.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        validate_id(id)?;
        match fs::remove_file(self.record_path(id)) {
            Ok(()) => {
                self.cache.lock().remove(id);
                self.sync_directory()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.cache.lock().remove(id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.ids()?.len())
    }
}
