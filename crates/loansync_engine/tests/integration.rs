//! Integration tests for the replica: on-disk store, importer, dispatcher
//! and reconciler working together.

use loansync_engine::{
    BatchHandler, MockRemote, ReconcileOutcome, Reconciler, RefetchReason, StartupReport,
    SyncConfig, SyncCoordinator, SyncError, SyncStatus,
};
use loansync_protocol::{
    DataEvent, Event, FieldChange, ObjectCreate, ObjectUpdate, SubscriptionEvents,
    SubscriptionEventsBatch,
};
use loansync_storage::{DataDir, JsonFileStore, ObjectStore, StoreResult};
use serde_json::{json, Value};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

const T0: i64 = 1_704_067_200_000; // 2024-01-01T00:00:00.000Z
const T1: i64 = T0 + 1_000;
const T2: i64 = T0 + 2_000;

fn loan(id: &str, version: i64) -> Value {
    json!({
        "id": id,
        "version": version,
        "createdAt": "2024-01-01T00:00:00.000Z",
        "updatedAt": "2024-01-01T00:00:00.000Z",
        "amount": 100,
        "fees": null,
    })
}

fn loans(n: usize) -> Vec<Value> {
    (0..n).map(|i| loan(&format!("loan-{i:03}"), 1)).collect()
}

fn batch(events: Vec<Event>) -> SubscriptionEventsBatch {
    SubscriptionEventsBatch::new(vec![SubscriptionEvents::new("sub-1", events).unwrap()])
}

fn data(event: impl Into<DataEvent>) -> Event {
    Event::from(event.into())
}

/// A store that widens the read-modify-write window.
struct SlowStore<S> {
    inner: S,
    delay: Duration,
}

impl<S: ObjectStore<Value>> ObjectStore<Value> for SlowStore<S> {
    fn read(&self, id: &str) -> StoreResult<Option<Value>> {
        let value = self.inner.read(id)?;
        thread::sleep(self.delay);
        Ok(value)
    }

    fn write(&self, id: &str, value: &Value) -> StoreResult<()> {
        self.inner.write(id, value)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.inner.delete(id)
    }

    fn count(&self) -> StoreResult<usize> {
        self.inner.count()
    }
}

#[test]
fn bulk_import_pages_and_persists() {
    let temp = tempdir().unwrap();
    let dir = DataDir::open(temp.path()).unwrap();
    let store: Arc<JsonFileStore> = Arc::new(dir.object_store("loans", 8).unwrap());
    let remote = Arc::new(MockRemote::with_objects(loans(25)));
    let status = dir.status_store::<SyncStatus>();

    let coordinator = SyncCoordinator::new(
        SyncConfig::new(temp.path()).with_page_size(10),
        Arc::clone(&store),
        Arc::clone(&remote),
        status,
    );
    let report = coordinator.initialize(false).unwrap();

    let StartupReport::Imported { summary, stored } = report else {
        panic!("expected an import");
    };
    assert_eq!(summary.pages, 3);
    assert_eq!(stored, 25);
    assert_eq!(remote.page_requests().len(), 3);

    // Count reflects disk even though the cache holds only 8 entries
    assert_eq!(store.cached_len(), 8);
    assert_eq!(store.count().unwrap(), 25);
    assert!(temp.path().join("loans").join("loan-024.json").exists());
    assert!(temp.path().join("status.json").exists());
}

#[test]
fn bulk_import_cap_keeps_full_pages() {
    let temp = tempdir().unwrap();
    let dir = DataDir::open(temp.path()).unwrap();
    let store: Arc<JsonFileStore> = Arc::new(dir.object_store("loans", 100).unwrap());
    let remote = Arc::new(MockRemote::with_objects(loans(25)));

    let coordinator = SyncCoordinator::new(
        SyncConfig::new(temp.path())
            .with_page_size(10)
            .with_import_limit(15),
        Arc::clone(&store),
        Arc::clone(&remote),
        dir.status_store::<SyncStatus>(),
    );
    coordinator.initialize(false).unwrap();

    assert_eq!(remote.page_requests().len(), 2);
    assert_eq!(store.count().unwrap(), 20);
}

#[test]
fn status_survives_reopen() {
    let temp = tempdir().unwrap();
    {
        let dir = DataDir::open(temp.path()).unwrap();
        let store: Arc<JsonFileStore> = Arc::new(dir.object_store("loans", 10).unwrap());
        let coordinator = SyncCoordinator::new(
            SyncConfig::new(temp.path()),
            store,
            Arc::new(MockRemote::with_objects(loans(3))),
            dir.status_store::<SyncStatus>(),
        );
        coordinator.initialize(false).unwrap();
    }

    let dir = DataDir::open(temp.path()).unwrap();
    let store: Arc<JsonFileStore> = Arc::new(dir.object_store("loans", 10).unwrap());
    let remote = Arc::new(MockRemote::with_objects(loans(3)));
    let coordinator = SyncCoordinator::new(
        SyncConfig::new(temp.path()),
        store,
        Arc::clone(&remote),
        dir.status_store::<SyncStatus>(),
    );
    assert_eq!(
        coordinator.initialize(false).unwrap(),
        StartupReport::AlreadySynced { stored: 3 }
    );
    assert!(remote.page_requests().is_empty());
}

#[test]
fn webhook_body_end_to_end() {
    let temp = tempdir().unwrap();
    let dir = DataDir::open(temp.path()).unwrap();
    let store: Arc<JsonFileStore> = Arc::new(dir.object_store("loans", 10).unwrap());
    let remote = Arc::new(MockRemote::new());
    let coordinator = SyncCoordinator::new(
        SyncConfig::new(temp.path()),
        Arc::clone(&store),
        Arc::clone(&remote),
        dir.status_store::<SyncStatus>(),
    );
    coordinator.initialize(false).unwrap();

    let body = json!({
        "__typename": "SubscriptionEventsBatch",
        "nextPingBy": "2024-01-01T00:10:00.000Z",
        "subscriptionEvents": [{
            "__typename": "SubscriptionEvents",
            "subscriptionId": "sub-1",
            "events": [
                {"__typename": "PingEvent", "lastDeliveredEventId": "e0"},
                {
                    "__typename": "ObjectCreate",
                    "eventId": "e1",
                    "objectId": "loan-a",
                    "objectType": "Loan",
                    "objectCreatedAt": T0,
                    "organizationId": "org",
                    "userId": "user",
                    "value": loan("loan-a", 1)
                },
                {
                    "__typename": "ObjectUpdate",
                    "eventId": "e2",
                    "objectId": "loan-a",
                    "objectType": "Loan",
                    "objectVersion": 1,
                    "objectWasUpdatedAt": T0,
                    "objectNowUpdatedAt": T1,
                    "organizationId": "org",
                    "userId": "user",
                    "fieldChanges": [
                        {"__typename": "FieldUpdate", "selector": "amount", "oldValue": 100, "value": 250},
                        {"__typename": "FieldAppend", "selector": "fees", "value": {"kind": "late", "amount": 25}}
                    ]
                }
            ]
        }]
    });
    let batch = SubscriptionEventsBatch::from_slice(&serde_json::to_vec(&body).unwrap()).unwrap();

    let summary = coordinator.handle_batch(&batch).unwrap();
    assert_eq!(summary.pings, 1);
    assert_eq!(summary.written, 2);

    let stored = store.read("loan-a").unwrap().unwrap();
    assert_eq!(stored["version"], json!(2));
    assert_eq!(stored["amount"], json!(250));
    assert_eq!(stored["fees"], json!([{"kind": "late", "amount": 25}]));
    assert_eq!(stored["updatedAt"], json!("2024-01-01T00:00:01.000Z"));
    assert_eq!(remote.object_fetches(), 0);

    // Redelivery: the create resets the base and the update applies again
    let summary = coordinator.handle_batch(&batch).unwrap();
    assert_eq!(summary.written, 2);
    assert_eq!(store.read("loan-a").unwrap().unwrap(), stored);
}

#[test]
fn gap_and_stale_and_self_heal() {
    let remote = Arc::new(MockRemote::new());
    let mut fresh = loan("loan-1", 7);
    fresh["amount"] = json!(700);
    remote.insert(fresh.clone());

    let temp = tempdir().unwrap();
    let store: JsonFileStore = JsonFileStore::open(temp.path(), 10);
    let reconciler = Reconciler::new(store, Arc::clone(&remote));

    // Gap: local 3, event base 5
    reconciler.store().write("loan-1", &loan("loan-1", 3)).unwrap();
    let gap = DataEvent::from(
        ObjectUpdate::new("loan-1", "Loan", T0, T1, vec![FieldChange::update("amount", json!(1), json!(2))])
            .with_version(5),
    );
    assert_eq!(
        reconciler.reconcile(&gap).unwrap(),
        ReconcileOutcome::Refetched(RefetchReason::Gap)
    );
    assert_eq!(reconciler.store().read("loan-1").unwrap(), Some(fresh.clone()));

    // Stale: local 7, event base 3
    let stale = DataEvent::from(ObjectUpdate::new("loan-1", "Loan", T0, T1, vec![]).with_version(3));
    assert_eq!(reconciler.reconcile(&stale).unwrap(), ReconcileOutcome::Ignored);
    assert_eq!(reconciler.store().read("loan-1").unwrap(), Some(fresh.clone()));

    // Self-heal: second change does not resolve, nothing half-applied
    reconciler.store().write("loan-1", &loan("loan-1", 7)).unwrap();
    let broken = DataEvent::from(
        ObjectUpdate::new(
            "loan-1",
            "Loan",
            T0,
            T1,
            vec![
                FieldChange::update("amount", json!(100), json!(101)),
                FieldChange::update("borrower.name", json!(null), json!("x")),
            ],
        )
        .with_version(7),
    );
    assert_eq!(
        reconciler.reconcile(&broken).unwrap(),
        ReconcileOutcome::Refetched(RefetchReason::PatchFailed)
    );
    let stored = reconciler.store().read("loan-1").unwrap().unwrap();
    assert_eq!(stored, fresh);
    assert_eq!(stored["version"], json!(7));
}

#[test]
fn remote_outage_fails_batch_and_redelivery_recovers() {
    let temp = tempdir().unwrap();
    let store: JsonFileStore = JsonFileStore::open(temp.path(), 10);
    store.write("loan-1", &loan("loan-1", 1)).unwrap();

    let remote = Arc::new(MockRemote::with_objects(vec![loan("loan-1", 4)]));
    let coordinator_store = Arc::new(store);
    let coordinator = SyncCoordinator::new(
        SyncConfig::new(temp.path()),
        Arc::clone(&coordinator_store),
        Arc::clone(&remote),
        loansync_storage::SingletonStore::new(
            loansync_storage::InMemoryStore::<SyncStatus>::new(),
            "status",
        ),
    );

    let delivery = batch(vec![
        data(ObjectUpdate::new("loan-1", "Loan", T0, T1, vec![]).with_version(3)),
        data(ObjectCreate::new("loan-2", "Loan", loan("loan-2", 1))),
    ]);

    remote.set_failing(true);
    let err = coordinator.handle_batch(&delivery).unwrap_err();
    assert!(matches!(err, SyncError::BatchFailed { failed: 1, total: 2, .. }));
    assert!(err.is_retryable());
    // Sibling stays durable, failed object untouched
    assert!(coordinator_store.read("loan-2").unwrap().is_some());
    assert_eq!(coordinator_store.read("loan-1").unwrap(), Some(loan("loan-1", 1)));

    remote.set_failing(false);
    coordinator.handle_batch(&delivery).unwrap();
    assert_eq!(coordinator_store.read("loan-1").unwrap(), Some(loan("loan-1", 4)));
}

#[test]
fn concurrent_updates_from_same_base_serialize() {
    let temp = tempdir().unwrap();
    let inner: JsonFileStore = JsonFileStore::open(temp.path(), 10);
    inner.write("loan-1", &loan("loan-1", 1)).unwrap();
    let store = SlowStore {
        inner,
        delay: Duration::from_millis(30),
    };
    let reconciler = Reconciler::new(store, MockRemote::new());

    let first = DataEvent::from(
        ObjectUpdate::new("loan-1", "Loan", T0, T1, vec![FieldChange::update("amount", json!(100), json!(1))])
            .with_version(1),
    );
    let second = DataEvent::from(
        ObjectUpdate::new("loan-1", "Loan", T0, T1, vec![FieldChange::append("fees", json!(5))])
            .with_version(1),
    );

    let barrier = Barrier::new(2);
    let outcomes: Vec<ReconcileOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = [&first, &second]
            .into_iter()
            .map(|event| {
                let reconciler = &reconciler;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    reconciler.reconcile(event).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let patched = outcomes
        .iter()
        .filter(|o| **o == ReconcileOutcome::Patched)
        .count();
    let ignored = outcomes
        .iter()
        .filter(|o| **o == ReconcileOutcome::Ignored)
        .count();
    assert_eq!((patched, ignored), (1, 1));

    let stored = reconciler.store().read("loan-1").unwrap().unwrap();
    assert_eq!(stored["version"], json!(2));
    // Exactly one of the two changes landed
    let amount_changed = stored["amount"] == json!(1);
    let fee_appended = stored["fees"] == json!([5]);
    assert!(amount_changed != fee_appended);
}

#[test]
fn concurrent_chained_updates_converge() {
    // Whatever order the two updates run in, the result matches the remote
    let mut expected = loan("loan-1", 3);
    expected["amount"] = json!(200);
    expected["fees"] = json!([25]);
    expected["updatedAt"] = json!("2024-01-01T00:00:02.000Z");

    let temp = tempdir().unwrap();
    let inner: JsonFileStore = JsonFileStore::open(temp.path(), 10);
    inner.write("loan-1", &loan("loan-1", 1)).unwrap();
    let reconciler = Reconciler::new(
        SlowStore {
            inner,
            delay: Duration::from_millis(10),
        },
        MockRemote::with_objects(vec![expected.clone()]),
    );

    let v1 = DataEvent::from(
        ObjectUpdate::new("loan-1", "Loan", T0, T1, vec![FieldChange::update("amount", json!(100), json!(200))])
            .with_version(1),
    );
    let v2 = DataEvent::from(
        ObjectUpdate::new("loan-1", "Loan", T1, T2, vec![FieldChange::append("fees", json!(25))])
            .with_version(2),
    );

    thread::scope(|scope| {
        scope.spawn(|| reconciler.reconcile(&v1).unwrap());
        scope.spawn(|| reconciler.reconcile(&v2).unwrap());
    });

    assert_eq!(reconciler.store().read("loan-1").unwrap(), Some(expected));
}

#[test]
fn events_for_other_types_are_not_stored() {
    let temp = tempdir().unwrap();
    let store: Arc<JsonFileStore> = Arc::new(JsonFileStore::open(temp.path(), 10));
    let coordinator = SyncCoordinator::new(
        SyncConfig::new(temp.path()),
        Arc::clone(&store),
        Arc::new(MockRemote::new()),
        loansync_storage::SingletonStore::new(
            loansync_storage::InMemoryStore::<SyncStatus>::new(),
            "status",
        ),
    );

    let summary = coordinator
        .handle_batch(&batch(vec![data(ObjectCreate::new(
            "b-1",
            "Borrower",
            json!({"id": "b-1"}),
        ))]))
        .unwrap();
    assert_eq!(summary.filtered, 1);
    assert_eq!(store.count().unwrap(), 0);
}
