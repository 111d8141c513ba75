//! In-memory object store for testing.

use crate::error::StoreResult;
use crate::store::{validate_id, ObjectStore};
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory object store.
///
/// This store keeps all records in a map and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Offline tooling that never needs persistence
///
/// It applies the same id validation as [`super::JsonFileStore`] so tests
/// exercise the same failure surface.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
#[derive(Debug)]
pub struct InMemoryStore<T = serde_json::Value> {
    records: RwLock<HashMap<String, T>>,
}

impl<T> InMemoryStore<T> {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Returns all stored ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> ObjectStore<T> for InMemoryStore<T> {
    fn read(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn write(&self, id: &str, value: &T) -> StoreResult<()> {
        validate_id(id)?;
        self.records.write().insert(id.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.records.write().remove(id);
        Ok(())
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.records.read().len())
    }
}
