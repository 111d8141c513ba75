//! Remote source abstraction.

use crate::error::{SyncError, SyncResult};
use crate::object;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Request for one page of the remote collection, ordered by `createdAt`
/// ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of objects to return.
    pub limit: usize,
    /// Number of objects to skip.
    pub offset: usize,
    /// Continuation token from the previous page, if the source issues
    /// them.
    pub cursor: Option<String>,
}

/// One page of the remote collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Full objects, in collection order.
    pub objects: Vec<Value>,
    /// Continuation token for the next page.
    pub next_cursor: Option<String>,
    /// Whether the source believes more objects follow.
    pub has_more: bool,
}

/// The authoritative source of objects.
///
/// This trait abstracts the remote API, allowing for different
/// implementations (GraphQL over HTTP, mock for testing, etc.).
pub trait RemoteSource: Send + Sync {
    /// Fetches the current full representation of one object.
    ///
    /// Returns `Ok(None)` if the object no longer exists remotely.
    fn fetch_object(&self, id: &str) -> SyncResult<Option<Value>>;

    /// Fetches one page of the collection.
    fn fetch_page(&self, request: &PageRequest) -> SyncResult<Page>;

    /// Returns the size of the collection.
    ///
    /// This is a hint; sources may cap or approximate it.
    fn total_count(&self) -> SyncResult<u64>;
}

impl<R: RemoteSource + ?Sized> RemoteSource for Arc<R> {
    fn fetch_object(&self, id: &str) -> SyncResult<Option<Value>> {
        (**self).fetch_object(id)
    }

    fn fetch_page(&self, request: &PageRequest) -> SyncResult<Page> {
        (**self).fetch_page(request)
    }

    fn total_count(&self) -> SyncResult<u64> {
        (**self).total_count()
    }
}

/// An in-memory remote source for testing.
///
/// Objects are served in insertion order. Every call is recorded so tests
/// can assert on remote traffic.
#[derive(Debug, Default)]
pub struct MockRemote {
    objects: Mutex<Vec<Value>>,
    total_count: Mutex<Option<u64>>,
    failing: AtomicBool,
    object_fetches: AtomicUsize,
    page_requests: Mutex<Vec<PageRequest>>,
}

impl MockRemote {
    /// Creates an empty mock remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock remote serving `objects`.
    pub fn with_objects(objects: Vec<Value>) -> Self {
        let remote = Self::new();
        *remote.objects.lock() = objects;
        remote
    }

    /// Inserts or replaces an object, keyed by its `id`.
    pub fn insert(&self, value: Value) {
        let mut objects = self.objects.lock();
        let id = object::object_id(&value).map(str::to_string);
        match objects
            .iter_mut()
            .find(|o| id.is_some() && object::object_id(o) == id.as_deref())
        {
            Some(existing) => *existing = value,
            None => objects.push(value),
        }
    }

    /// Removes an object.
    pub fn remove(&self, id: &str) {
        self.objects
            .lock()
            .retain(|o| object::object_id(o) != Some(id));
    }

    /// Overrides the reported total count.
    pub fn set_total_count(&self, count: Option<u64>) {
        *self.total_count.lock() = count;
    }

    /// Makes every call fail with a retryable transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the number of `fetch_object` calls made.
    pub fn object_fetches(&self) -> usize {
        self.object_fetches.load(Ordering::SeqCst)
    }

    /// Returns the page requests made, in order.
    pub fn page_requests(&self) -> Vec<PageRequest> {
        self.page_requests.lock().clone()
    }

    fn check_available(&self) -> SyncResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::transport_retryable("mock remote unavailable"));
        }
        Ok(())
    }
}

impl RemoteSource for MockRemote {
    fn fetch_object(&self, id: &str) -> SyncResult<Option<Value>> {
        self.object_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .objects
            .lock()
            .iter()
            .find(|o| object::object_id(o) == Some(id))
            .cloned())
    }

    fn fetch_page(&self, request: &PageRequest) -> SyncResult<Page> {
        self.page_requests.lock().push(request.clone());
        self.check_available()?;

        let objects = self.objects.lock();
        let start = request.offset.min(objects.len());
        let end = start.saturating_add(request.limit).min(objects.len());
        let has_more = end < objects.len();
        Ok(Page {
            objects: objects[start..end].to_vec(),
            next_cursor: has_more.then(|| end.to_string()),
            has_more,
        })
    }

    fn total_count(&self) -> SyncResult<u64> {
        self.check_available()?;
        if let Some(count) = *self.total_count.lock() {
            return Ok(count);
        }
        Ok(self.objects.lock().len() as u64)
    }
}
