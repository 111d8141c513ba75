//! End-to-end webhook tests: server, coordinator and on-disk replica.

use loansync_engine::{MockRemote, StartupReport, SyncConfig, SyncCoordinator, SyncStatus};
use loansync_protocol::{
    DataEvent, Event, FieldChange, ObjectCreate, ObjectDelete, ObjectUpdate, SubscriptionEvents,
    SubscriptionEventsBatch,
};
use loansync_server::{ServerConfig, WebhookServer};
use loansync_storage::{DataDir, JsonFileStore, ObjectStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

const T0: i64 = 1_704_067_200_000; // 2024-01-01T00:00:00.000Z

type Coordinator = SyncCoordinator<Arc<JsonFileStore>, Arc<MockRemote>, JsonFileStore<SyncStatus>>;

fn loan(id: &str, version: i64) -> Value {
    json!({"id": id, "version": version, "amount": 100})
}

fn body(events: Vec<Event>) -> Vec<u8> {
    SubscriptionEventsBatch::new(vec![SubscriptionEvents::new("sub-1", events).unwrap()])
        .encode()
        .unwrap()
}

fn data(event: impl Into<DataEvent>) -> Event {
    Event::from(event.into())
}

fn setup(dir: &DataDir, remote: Arc<MockRemote>) -> (Arc<Coordinator>, Arc<JsonFileStore>, WebhookServer) {
    let store: Arc<JsonFileStore> = Arc::new(dir.object_store("loans", 4).unwrap());
    let coordinator = Arc::new(SyncCoordinator::new(
        SyncConfig::new(dir.path()).with_page_size(3),
        Arc::clone(&store),
        remote,
        dir.status_store::<SyncStatus>(),
    ));
    let server = WebhookServer::new(ServerConfig::default(), coordinator.clone());
    (coordinator, store, server)
}

#[test]
fn import_then_live_events() {
    let temp = tempdir().unwrap();
    let dir = DataDir::open(temp.path()).unwrap();
    let remote = Arc::new(MockRemote::with_objects(
        (0..5).map(|i| loan(&format!("loan-{i}"), 1)).collect(),
    ));
    let (coordinator, store, server) = setup(&dir, remote);

    let early = body(vec![data(ObjectDelete::new("loan-0", "Loan"))]);
    assert_eq!(server.handle_request("POST", "/webhook", &early).status, 503);

    let report = server.go_live(|| coordinator.initialize(false)).unwrap();
    assert!(matches!(report, StartupReport::Imported { stored: 5, .. }));

    // The deferred batch is redelivered after the import
    assert_eq!(server.handle_request("POST", "/webhook", &early).status, 200);
    assert_eq!(store.read("loan-0").unwrap(), None);

    let changes = vec![FieldChange::update("amount", json!(100), json!(250))];
    let update = ObjectUpdate::new("loan-1", "Loan", T0, T0 + 1_000, changes).with_version(1);
    let response = server.handle_request("POST", "/webhook", &body(vec![data(update)]));
    assert_eq!(response.status, 200);
    assert_eq!(
        store.read("loan-1").unwrap(),
        Some(json!({
            "id": "loan-1",
            "version": 2,
            "amount": 250,
            "updatedAt": "2024-01-01T00:00:01.000Z",
        }))
    );
}

#[test]
fn remote_outage_answers_500() {
    let temp = tempdir().unwrap();
    let dir = DataDir::open(temp.path()).unwrap();
    let remote = Arc::new(MockRemote::new());
    let (coordinator, store, server) = setup(&dir, Arc::clone(&remote));
    server.go_live(|| coordinator.initialize(false)).unwrap();

    remote.insert(loan("loan-7", 3));
    remote.set_failing(true);

    // Unknown object: the update needs a refetch, which fails
    let update = ObjectUpdate::new("loan-7", "Loan", 0, 0, vec![]).with_version(2);
    let delivery = body(vec![data(update)]);
    assert_eq!(server.handle_request("POST", "/webhook", &delivery).status, 500);
    assert_eq!(store.read("loan-7").unwrap(), None);

    remote.set_failing(false);
    assert_eq!(server.handle_request("POST", "/webhook", &delivery).status, 200);
    assert_eq!(store.read("loan-7").unwrap(), Some(loan("loan-7", 3)));
}

#[test]
fn concurrent_deliveries() {
    let temp = tempdir().unwrap();
    let dir = DataDir::open(temp.path()).unwrap();
    let (coordinator, store, server) = setup(&dir, Arc::new(MockRemote::new()));
    server.go_live(|| coordinator.initialize(false)).unwrap();
    let server = Arc::new(server);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let server = Arc::clone(&server);
            thread::spawn(move || {
                let id = format!("loan-{i}");
                let create = ObjectCreate::new(id.as_str(), "Loan", loan(&id, 1));
                server
                    .handle_request("POST", "/webhook", &body(vec![data(create)]))
                    .status
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 200);
    }
    assert_eq!(store.count().unwrap(), 8);
}

#[test]
fn restart_skips_import_and_goes_live() {
    let temp = tempdir().unwrap();
    let remote = Arc::new(MockRemote::with_objects(vec![loan("loan-1", 1)]));
    {
        let dir = DataDir::open(temp.path()).unwrap();
        let (coordinator, _, server) = setup(&dir, Arc::clone(&remote));
        server.go_live(|| coordinator.initialize(false)).unwrap();
    }

    let dir = DataDir::open(temp.path()).unwrap();
    let (coordinator, _, server) = setup(&dir, remote);
    let report = server.go_live(|| coordinator.initialize(false)).unwrap();
    assert_eq!(report, StartupReport::AlreadySynced { stored: 1 });
    assert!(server.is_accepting());
}
