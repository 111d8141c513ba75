//! Bulk snapshot import.

use crate::error::{SyncError, SyncResult};
use crate::object;
use crate::remote::{PageRequest, RemoteSource};
use loansync_storage::ObjectStore;
use serde_json::Value;
use tracing::info;

/// Result of one bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Objects written to the store.
    pub imported: usize,
    /// Pages requested.
    pub pages: usize,
    /// Total count reported by the remote, if it was within the trusted
    /// cap.
    pub total: Option<u64>,
    /// Whether the import stopped because of the configured cap.
    pub reached_limit: bool,
}

/// Seeds a store with a full snapshot of the remote collection.
///
/// Pages are requested in `createdAt` order and every object is written as
/// if it had been created; no version logic applies to a cold load. The
/// import stops after a short page, once the trusted total count is
/// reached, or once the cap is reached. Objects of the page that crosses
/// the cap are all kept.
pub struct BulkImporter<S, R> {
    store: S,
    remote: R,
    total_count_cap: u64,
}

impl<S, R> BulkImporter<S, R>
where
    S: ObjectStore<Value>,
    R: RemoteSource,
{
    /// Creates an importer writing to `store`.
    pub fn new(store: S, remote: R) -> Self {
        Self {
            store,
            remote,
            total_count_cap: 1000,
        }
    }

    /// Sets the largest total count that is trusted for termination.
    pub fn with_total_count_cap(mut self, cap: u64) -> Self {
        self.total_count_cap = cap;
        self
    }

    /// Returns the object store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Imports up to `max_objects` objects (all if `None`) in pages of
    /// `page_size`.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote fails, an object has no string `id`,
    /// or a write fails. Objects written before the error stay durable.
    pub fn import(&self, page_size: usize, max_objects: Option<usize>) -> SyncResult<ImportSummary> {
        let page_size = page_size.max(1);
        let reported = self.remote.total_count()?;
        let total = (reported <= self.total_count_cap).then_some(reported);
        let total_display = match total {
            Some(total) => total.to_string(),
            None => format!(">{}", self.total_count_cap),
        };

        match max_objects {
            Some(limit) => info!("Performing initial import of {limit} objects"),
            None => info!("Performing initial import of all objects"),
        }

        let mut summary = ImportSummary {
            total,
            ..ImportSummary::default()
        };
        let mut cursor = None;
        let mut offset = 0;

        loop {
            let end = match total {
                Some(total) => (offset + page_size).min(usize::try_from(total).unwrap_or(usize::MAX)),
                None => offset + page_size,
            };
            info!("Fetching objects {}-{} of {}", offset + 1, end, total_display);

            let page = self.remote.fetch_page(&PageRequest {
                limit: page_size,
                offset,
                cursor: cursor.take(),
            })?;
            summary.pages += 1;

            let received = page.objects.len();
            for (i, value) in page.objects.iter().enumerate() {
                let id = object::object_id(value).ok_or_else(|| {
                    SyncError::InvalidResponse(format!("object at offset {} has no id", offset + i))
                })?;
                self.store.write(id, value)?;
            }
            summary.imported += received;
            offset += received;

            let exhausted = received < page_size
                || !page.has_more
                || total.is_some_and(|total| summary.imported as u64 >= total);
            if exhausted {
                break;
            }
            if let Some(limit) = max_objects {
                if summary.imported >= limit {
                    info!("Reached import limit of {limit} objects");
                    summary.reached_limit = true;
                    break;
                }
            }
            cursor = page.next_cursor;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemote;
    use loansync_storage::InMemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn loans(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({"id": format!("loan-{i:03}"), "version": 1}))
            .collect()
    }

    fn importer(remote: &Arc<MockRemote>) -> BulkImporter<InMemoryStore, Arc<MockRemote>> {
        let store: InMemoryStore = InMemoryStore::new();
        BulkImporter::new(store, Arc::clone(remote))
    }

    #[test]
    fn imports_until_short_page() {
        let remote = Arc::new(MockRemote::with_objects(loans(25)));
        let importer = importer(&remote);

        let summary = importer.import(10, None).unwrap();
        assert_eq!(summary.imported, 25);
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.total, Some(25));
        assert!(!summary.reached_limit);
        assert_eq!(importer.store().count().unwrap(), 25);

        let offsets: Vec<_> = remote.page_requests().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 10, 20]);
    }

    #[test]
    fn stops_at_total_without_empty_page() {
        let remote = Arc::new(MockRemote::with_objects(loans(20)));
        let summary = importer(&remote).import(10, None).unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.imported, 20);
    }

    #[test]
    fn cap_keeps_whole_page() {
        let remote = Arc::new(MockRemote::with_objects(loans(25)));
        let importer = importer(&remote);

        let summary = importer.import(10, Some(15)).unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.imported, 20);
        assert!(summary.reached_limit);
        assert_eq!(importer.store().count().unwrap(), 20);
    }

    #[test]
    fn short_page_wins_over_total_hint() {
        // Total overstates the collection; the short page still terminates
        let remote = Arc::new(MockRemote::with_objects(loans(7)));
        remote.set_total_count(Some(50));
        let summary = importer(&remote).import(5, None).unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.imported, 7);
    }

    #[test]
    fn untrusted_total_is_ignored() {
        let remote = Arc::new(MockRemote::with_objects(loans(12)));
        remote.set_total_count(Some(5000));
        let importer = importer(&remote).with_total_count_cap(1000);

        let summary = importer.import(4, None).unwrap();
        assert_eq!(summary.total, None);
        assert_eq!(summary.imported, 12);
        assert_eq!(summary.pages, 3);
    }

    #[test]
    fn empty_collection() {
        let remote = Arc::new(MockRemote::new());
        let summary = importer(&remote).import(10, None).unwrap();
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.imported, 0);
    }

    #[test]
    fn object_without_id_fails() {
        let remote = Arc::new(MockRemote::with_objects(vec![json!({"name": "x"})]));
        let result = importer(&remote).import(10, None);
        assert!(matches!(result, Err(SyncError::InvalidResponse(_))));
    }

    #[test]
    fn remote_failure_propagates() {
        let remote = Arc::new(MockRemote::with_objects(loans(3)));
        remote.set_failing(true);
        assert!(importer(&remote).import(10, None).unwrap_err().is_retryable());
    }
}
