//! Offline queue behaviour across restarts, backed by the on-disk store.

use anglerhub_client::{
    ClientError, ClientResult, JsonFileStore, MutationKind, MutationTransport, OfflineQueue,
    PendingRecord, QueueStore, SyncReport,
};
use async_trait::async_trait;
use mockable::DefaultClock;
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Rejects payloads whose `species` is listed.
struct RejectingTransport {
    rejected: Vec<&'static str>,
    delivered: Mutex<Vec<String>>,
}

impl RejectingTransport {
    fn new(rejected: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            rejected,
            delivered: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MutationTransport for RejectingTransport {
    async fn deliver(&self, record: &PendingRecord) -> ClientResult<()> {
        let species = record.payload["species"].as_str().unwrap_or_default();
        if self.rejected.contains(&species) {
            return Err(ClientError::Status {
                status: 422,
                message: "The given data was invalid.".into(),
            });
        }
        self.delivered.lock().unwrap().push(species.to_string());
        Ok(())
    }
}

async fn open(path: &Path, transport: Arc<RejectingTransport>, online: bool) -> Arc<OfflineQueue> {
    OfflineQueue::open(
        Arc::new(JsonFileStore::new(path)),
        transport,
        Arc::new(DefaultClock),
        online,
    )
    .await
}

#[tokio::test]
async fn restart_restores_pending_records_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offline.json");

    let queue = open(&path, RejectingTransport::new(vec![]), false).await;
    for species in ["Carp", "Tench", "Roach"] {
        queue
            .enqueue(MutationKind::CreateCatch, json!({ "species": species }))
            .await
            .unwrap();
    }
    drop(queue);

    let transport = RejectingTransport::new(vec![]);
    let restarted = open(&path, transport.clone(), true).await;
    let restored: Vec<String> = restarted
        .pending()
        .await
        .iter()
        .map(|r| r.payload["species"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(restored, vec!["Carp", "Tench", "Roach"]);

    let report = restarted.sync_all().await;
    assert_eq!(report, SyncReport { attempted: 3, succeeded: 3 });
    assert_eq!(*transport.delivered.lock().unwrap(), vec!["Carp", "Tench", "Roach"]);

    let on_disk = JsonFileStore::new(&path).load().await.unwrap();
    assert!(on_disk.records.is_empty());
    assert!(on_disk.last_sync.is_some());
}

#[tokio::test]
async fn failed_record_survives_restart_with_its_retry_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offline.json");

    let queue = open(&path, RejectingTransport::new(vec!["B"]), false).await;
    for species in ["A", "B", "C"] {
        queue
            .enqueue(MutationKind::CreateCatch, json!({ "species": species }))
            .await
            .unwrap();
    }
    queue.set_online(true);
    assert_eq!(queue.sync_all().await, SyncReport { attempted: 3, succeeded: 2 });
    drop(queue);

    let on_disk = JsonFileStore::new(&path).load().await.unwrap();
    assert_eq!(on_disk.records.len(), 1);
    assert_eq!(on_disk.records[0].payload["species"], "B");
    assert_eq!(on_disk.records[0].retry_count, 1);
}

#[tokio::test]
async fn unreadable_document_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offline.json");
    std::fs::write(&path, "[[[").unwrap();

    let queue = open(&path, RejectingTransport::new(vec![]), false).await;
    assert_eq!(queue.stats().await.total, 0);

    queue
        .enqueue(MutationKind::UpdateProfile, json!({ "location": "Lake Vänern" }))
        .await
        .unwrap();
    let on_disk = JsonFileStore::new(&path).load().await.unwrap();
    assert_eq!(on_disk.records.len(), 1);
    assert_eq!(on_disk.records[0].kind, MutationKind::UpdateProfile);
}
