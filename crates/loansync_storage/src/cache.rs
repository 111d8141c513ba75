//! Bounded least-recently-used cache.

use std::collections::{BTreeMap, HashMap};

/// A bounded least-recently-used map from object id to value.
///
/// Every `get` or `insert` marks the entry as most recently used. When an
/// insert would exceed the capacity, the least recently used entry is
/// evicted. A capacity of zero disables caching entirely.
///
/// This type is not synchronized; owners wrap it in a lock.
///
/// # Example
///
/// ```rust
/// use loansync_storage::LruCache;
///
/// let mut cache = LruCache::new(2);
/// cache.insert("a".into(), 1);
/// cache.insert("b".into(), 2);
/// cache.get("a");
/// cache.insert("c".into(), 3); // evicts "b"
/// assert!(cache.get("b").is_none());
/// assert_eq!(cache.get("a"), Some(&1));
/// ```
#[derive(Debug)]
pub struct LruCache<V> {
    capacity: usize,
    entries: HashMap<String, (V, u64)>,
    /// Recency tick -> id; the first entry is the eviction candidate.
    order: BTreeMap<u64, String>,
    tick: u64,
}

impl<V> LruCache<V> {
    /// Creates a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            tick: 0,
        }
    }

    /// Returns the maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Looks up `key`, marking it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let tick = self.next_tick();
        let (_, used) = self.entries.get_mut(key)?;
        self.order.remove(&*used);
        *used = tick;
        self.order.insert(tick, key.to_string());
        self.entries.get(key).map(|(value, _)| value)
    }

    /// Inserts or replaces `key`, evicting the least recently used entry
    /// if the cache is full.
    pub fn insert(&mut self, key: String, value: V) {
        if self.capacity == 0 {
            return;
        }
        let tick = self.next_tick();
        if let Some((_, used)) = self.entries.get(&key) {
            self.order.remove(used);
        } else if self.entries.len() >= self.capacity {
            if let Some((_, evicted)) = self.order.pop_first() {
                self.entries.remove(&evicted);
            }
        }
        self.order.insert(tick, key.clone());
        self.entries.insert(key, (value, tick));
    }

    /// Removes `key` from the cache, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let (value, used) = self.entries.remove(key)?;
        self.order.remove(&used);
        Some(value)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
