//! Per-object mutual exclusion.

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

/// A map of mutexes keyed by object id.
///
/// Entries exist only while a guard for the key is held or awaited, so the
/// map stays as small as the number of objects in flight.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Creates an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the lock for `key` is held.
    pub fn lock(&self, key: &str) -> KeyGuard<'_> {
        let entry = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        let guard = entry.lock_arc();
        KeyGuard {
            owner: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Returns the number of keys currently locked or awaited.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Returns true if no key is locked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds the lock for one key until dropped.
#[must_use = "the key is unlocked when the guard is dropped"]
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.owner.locks.lock();
        drop(self.guard.take());
        // Waiters clone the entry under the map lock, so a count of one
        // means nobody else wants this key.
        if locks
            .get(&self.key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&self.key);
        }
    }
}
