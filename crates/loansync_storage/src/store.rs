//! Object store trait definition.

use crate::error::{StoreError, StoreResult};
use std::marker::PhantomData;
use std::sync::Arc;

/// Durable key-value persistence for one object type.
///
/// # Invariants
///
/// - `write` and `delete` are durable when they return `Ok`
/// - `read` of an id that was never written (or was deleted) is `Ok(None)`
/// - `count` is the number of durable records, independent of any cache
/// - Calls for different ids may run concurrently without interference
///
/// # Implementors
///
/// - [`super::JsonFileStore`] - For persistent storage
/// - [`super::InMemoryStore`] - For testing
pub trait ObjectStore<T>: Send + Sync {
    /// Reads the object stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read or decoded.
    fn read(&self, id: &str) -> StoreResult<Option<T>>;

    /// Writes `value` under `id`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid or the write cannot be made
    /// durable.
    fn write(&self, id: &str, value: &T) -> StoreResult<()>;

    /// Deletes the object stored under `id`.
    ///
    /// Deleting an absent id succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails for a reason other than the
    /// record not existing.
    fn delete(&self, id: &str) -> StoreResult<()>;

    /// Returns the number of durable records.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be enumerated.
    fn count(&self) -> StoreResult<usize>;
}

impl<T, S: ObjectStore<T> + ?Sized> ObjectStore<T> for Arc<S> {
    fn read(&self, id: &str) -> StoreResult<Option<T>> {
        (**self).read(id)
    }

    fn write(&self, id: &str, value: &T) -> StoreResult<()> {
        (**self).write(id, value)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn count(&self) -> StoreResult<usize> {
        (**self).count()
    }
}

/// Checks that an object id can be used as a record name.
///
/// Ids become file names, so path separators, leading dots and control
/// characters are rejected.
///
/// # Errors
///
/// Returns [`StoreError::InvalidId`] for unusable ids.
pub fn validate_id(id: &str) -> StoreResult<()> {
    let invalid = id.is_empty()
        || id.starts_with('.')
        || id.chars().any(|c| c == '/' || c == '\\' || c.is_control());
    if invalid {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// A single fixed-id record projected over a keyed store.
///
/// Used for process-wide state such as the sync status.
///
/// # Example
///
/// ```rust
/// use loansync_storage::{InMemoryStore, SingletonStore};
///
/// let status: SingletonStore<serde_json::Value, InMemoryStore> =
///     SingletonStore::new(InMemoryStore::new(), "status");
/// assert!(status.read().unwrap().is_none());
/// status.write(&serde_json::json!({"synced": true})).unwrap();
/// assert!(status.read().unwrap().is_some());
/// ```
pub struct SingletonStore<T, S: ObjectStore<T>> {
    base: S,
    id: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S: ObjectStore<T>> SingletonStore<T, S> {
    /// Creates a singleton over `base` using the fixed record `id`.
    pub fn new(base: S, id: impl Into<String>) -> Self {
        Self {
            base,
            id: id.into(),
            _marker: PhantomData,
        }
    }

    /// Returns the fixed record id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reads the record.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying store.
    pub fn read(&self) -> StoreResult<Option<T>> {
        self.base.read(&self.id)
    }

    /// Writes the record.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying store.
    pub fn write(&self, value: &T) -> StoreResult<()> {
        self.base.write(&self.id, value)
    }

    /// Deletes the record.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying store.
    pub fn delete(&self) -> StoreResult<()> {
        self.base.delete(&self.id)
    }
}
