//! crates/anglerhub_client/src/queue.rs
//!
//! The offline mutation queue. Mutations made without connectivity are kept
//! on disk and replayed, oldest first, once the client is back online.
//! Delivery is at-least-once: a record is only dropped after the server
//! accepted it or after it failed `MAX_RETRIES` times.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ClientResult;
use crate::record::{MutationKind, PendingRecord, QueueDocument};
use crate::storage::QueueStore;
use crate::transport::MutationTransport;

/// Failed attempts after which a record is abandoned.
pub const MAX_RETRIES: u32 = 3;

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub attempted: usize,
    pub succeeded: usize,
}

impl SyncReport {
    pub fn all_succeeded(&self) -> bool {
        self.attempted == self.succeeded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub unsynced: usize,
    pub by_kind: BTreeMap<MutationKind, usize>,
    pub last_sync: Option<DateTime<Utc>>,
}

pub struct OfflineQueue {
    store: Arc<dyn QueueStore>,
    transport: Arc<dyn MutationTransport>,
    clock: Arc<dyn Clock>,
    document: Mutex<QueueDocument>,
    online: AtomicBool,
    syncing: AtomicBool,
    /// Set by a pass refused because another was running.
    rerun: AtomicBool,
}

/// Clears the re-entrancy flag when a sync pass ends, however it ends.
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl OfflineQueue {
    /// Loads the persisted document. An unreadable document is logged and the
    /// queue starts empty.
    pub async fn open(
        store: Arc<dyn QueueStore>,
        transport: Arc<dyn MutationTransport>,
        clock: Arc<dyn Clock>,
        online: bool,
    ) -> Arc<Self> {
        let document = match store.load().await {
            Ok(document) => document,
            Err(e) => {
                error!("Failed to read the offline queue, starting empty: {}", e);
                QueueDocument::default()
            }
        };
        if !document.records.is_empty() {
            info!(pending = document.records.len(), "Restored offline queue");
        }
        Arc::new(Self {
            store,
            transport,
            clock,
            document: Mutex::new(document),
            online: AtomicBool::new(online),
            syncing: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
        })
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    /// Appends and persists a record. When online, a sync pass is started in
    /// the background; the caller does not wait for it.
    pub async fn enqueue(self: &Arc<Self>, kind: MutationKind, payload: Value) -> ClientResult<Uuid> {
        let record = PendingRecord {
            id: Uuid::new_v4(),
            kind,
            payload,
            created_at: self.clock.utc(),
            synced: false,
            retry_count: 0,
        };
        let id = record.id;
        {
            let mut document = self.document.lock().await;
            document.records.push(record);
            if let Err(e) = self.store.save(&document).await {
                document.records.pop();
                return Err(e);
            }
        }
        info!(%id, %kind, "Queued offline mutation");

        if self.is_online() {
            let queue = Arc::clone(self);
            tokio::spawn(async move {
                queue.sync_all().await;
            });
        }
        Ok(id)
    }

    /// Replays every unsynced record once, oldest first.
    ///
    /// Returns an empty report when offline or when another pass is running.
    /// A refused pass flags the running one, which then also replays the
    /// records queued since it started.
    pub async fn sync_all(&self) -> SyncReport {
        let mut report = SyncReport::default();
        let mut attempted = HashSet::new();
        while self.is_online() {
            if self.syncing.swap(true, Ordering::AcqRel) {
                self.rerun.store(true, Ordering::Release);
                break;
            }
            {
                let _guard = SyncingGuard(&self.syncing);
                loop {
                    self.rerun.store(false, Ordering::Release);
                    let pass = self.replay_unsynced(&mut attempted).await;
                    report.attempted += pass.attempted;
                    report.succeeded += pass.succeeded;
                    if !self.rerun.load(Ordering::Acquire) {
                        break;
                    }
                }
            }
            // A pass refused between the last check and the release.
            if !self.rerun.load(Ordering::Acquire) {
                break;
            }
        }
        report
    }

    /// Delivers the unsynced records not in `attempted`, adding them to it.
    async fn replay_unsynced(&self, attempted: &mut HashSet<Uuid>) -> SyncReport {
        let pending: Vec<PendingRecord> = {
            let document = self.document.lock().await;
            document
                .records
                .iter()
                .filter(|r| !r.synced && !attempted.contains(&r.id))
                .cloned()
                .collect()
        };
        if pending.is_empty() {
            return SyncReport::default();
        }
        info!("Syncing {} offline records", pending.len());

        let mut report = SyncReport::default();
        for record in &pending {
            attempted.insert(record.id);
            report.attempted += 1;
            match self.transport.deliver(record).await {
                Ok(()) => {
                    report.succeeded += 1;
                    self.mark_synced(record.id).await;
                }
                Err(e) => {
                    warn!(id = %record.id, kind = %record.kind, "Failed to sync record: {}", e);
                    self.record_failure(record.id).await;
                }
            }
        }

        {
            let mut document = self.document.lock().await;
            document.last_sync = Some(self.clock.utc());
            self.persist(&document).await;
        }
        info!("Synced {}/{} records", report.succeeded, report.attempted);
        report
    }

    pub async fn stats(&self) -> QueueStats {
        let document = self.document.lock().await;
        let mut by_kind = BTreeMap::new();
        for record in &document.records {
            *by_kind.entry(record.kind).or_insert(0) += 1;
        }
        QueueStats {
            total: document.records.len(),
            unsynced: document.records.iter().filter(|r| !r.synced).count(),
            by_kind,
            last_sync: document.last_sync,
        }
    }

    pub async fn pending(&self) -> Vec<PendingRecord> {
        self.document.lock().await.records.clone()
    }

    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.document.lock().await.last_sync
    }

    /// Drops every record and the last-sync time.
    pub async fn clear(&self) -> ClientResult<()> {
        let mut document = self.document.lock().await;
        let previous = std::mem::take(&mut *document);
        if let Err(e) = self.store.save(&document).await {
            *document = previous;
            return Err(e);
        }
        Ok(())
    }

    async fn mark_synced(&self, id: Uuid) {
        let mut document = self.document.lock().await;
        document.records.retain(|r| r.id != id);
        self.persist(&document).await;
    }

    async fn record_failure(&self, id: Uuid) {
        let mut document = self.document.lock().await;
        let Some(position) = document.records.iter().position(|r| r.id == id) else {
            return;
        };
        let record = &mut document.records[position];
        record.retry_count += 1;
        if record.retry_count >= MAX_RETRIES {
            warn!(%id, kind = %record.kind, "Abandoning record after {} failed attempts", MAX_RETRIES);
            document.records.remove(position);
        }
        self.persist(&document).await;
    }

    /// Sync keeps going when a write fails; the next mutation rewrites the
    /// whole document anyway.
    async fn persist(&self, document: &QueueDocument) {
        if let Err(e) = self.store.save(document).await {
            error!("Failed to persist the offline queue: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::storage::InMemoryStore;
    use async_trait::async_trait;
    use chrono::{Local, TimeZone};
    use rstest::rstest;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn local(&self) -> DateTime<Local> {
            self.0.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Fails every record whose payload carries a `tag` listed in `failing`.
    #[derive(Default)]
    struct ScriptedTransport {
        failing: StdMutex<HashSet<String>>,
        delivered: StdMutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn failing(tags: &[&str]) -> Self {
            Self {
                failing: StdMutex::new(tags.iter().map(|t| t.to_string()).collect()),
                delivered: StdMutex::default(),
            }
        }

        fn delivered(&self) -> Vec<String> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MutationTransport for ScriptedTransport {
        async fn deliver(&self, record: &PendingRecord) -> ClientResult<()> {
            let tag = record.payload["tag"].as_str().unwrap_or_default().to_string();
            if self.failing.lock().unwrap().contains(&tag) {
                return Err(ClientError::Status {
                    status: 500,
                    message: format!("{tag} rejected"),
                });
            }
            self.delivered.lock().unwrap().push(tag);
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 12, 5, 45, 0).unwrap()
    }

    async fn offline_queue(transport: Arc<ScriptedTransport>) -> (Arc<OfflineQueue>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::default());
        let queue = OfflineQueue::open(
            store.clone(),
            transport,
            Arc::new(FixedClock(now())),
            false,
        )
        .await;
        (queue, store)
    }

    async fn enqueue_tagged(queue: &Arc<OfflineQueue>, tags: &[&str]) {
        for tag in tags {
            queue
                .enqueue(MutationKind::CreateCatch, json!({ "tag": tag }))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn enqueue_while_offline_persists_without_sending() {
        let transport = Arc::new(ScriptedTransport::default());
        let (queue, store) = offline_queue(transport.clone()).await;

        let id = queue
            .enqueue(MutationKind::CreateGoal, json!({ "title": "Ten walleye" }))
            .await
            .unwrap();

        let saved = store.snapshot();
        assert_eq!(saved.records.len(), 1);
        assert_eq!(saved.records[0].id, id);
        assert_eq!(saved.records[0].retry_count, 0);
        assert!(!saved.records[0].synced);
        assert_eq!(saved.records[0].created_at, now());
        assert_eq!(queue.sync_all().await, SyncReport::default());
        assert!(transport.delivered().is_empty());
    }

    #[tokio::test]
    async fn sync_delivers_oldest_first() {
        let transport = Arc::new(ScriptedTransport::default());
        let (queue, store) = offline_queue(transport.clone()).await;
        enqueue_tagged(&queue, &["a", "b", "c"]).await;

        queue.set_online(true);
        let report = queue.sync_all().await;

        assert_eq!(report, SyncReport { attempted: 3, succeeded: 3 });
        assert!(report.all_succeeded());
        assert_eq!(transport.delivered(), vec!["a", "b", "c"]);
        assert!(queue.pending().await.is_empty());
        assert_eq!(store.snapshot().last_sync, Some(now()));
    }

    #[tokio::test]
    async fn failures_do_not_block_later_records() {
        let transport = Arc::new(ScriptedTransport::failing(&["b"]));
        let (queue, _) = offline_queue(transport.clone()).await;
        enqueue_tagged(&queue, &["a", "b", "c"]).await;

        queue.set_online(true);
        let report = queue.sync_all().await;

        assert_eq!(report, SyncReport { attempted: 3, succeeded: 2 });
        assert_eq!(transport.delivered(), vec!["a", "c"]);
        let left = queue.pending().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].payload["tag"], "b");
        assert_eq!(left[0].retry_count, 1);
    }

    #[rstest]
    #[case(1, Some(1))]
    #[case(2, Some(2))]
    #[case(3, None)]
    #[tokio::test]
    async fn retry_cap(#[case] passes: u32, #[case] expected_retries: Option<u32>) {
        let transport = Arc::new(ScriptedTransport::failing(&["x"]));
        let (queue, _) = offline_queue(transport).await;
        enqueue_tagged(&queue, &["x"]).await;
        queue.set_online(true);

        for _ in 0..passes {
            queue.sync_all().await;
        }

        let retries = queue.pending().await.first().map(|r| r.retry_count);
        assert_eq!(retries, expected_retries);
    }

    #[tokio::test]
    async fn stats_and_clear() {
        let transport = Arc::new(ScriptedTransport::default());
        let (queue, store) = offline_queue(transport).await;
        enqueue_tagged(&queue, &["a", "b"]).await;
        queue
            .enqueue(MutationKind::UpdateProfile, json!({ "bio": "fly fishing" }))
            .await
            .unwrap();

        let stats = queue.stats().await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unsynced, 3);
        assert_eq!(stats.by_kind.get(&MutationKind::CreateCatch), Some(&2));
        assert_eq!(stats.by_kind.get(&MutationKind::UpdateProfile), Some(&1));
        assert_eq!(stats.last_sync, None);

        queue.clear().await.unwrap();
        assert_eq!(queue.stats().await.total, 0);
        assert_eq!(store.snapshot(), QueueDocument::default());
    }

    /// Blocks inside `deliver` for the record tagged "a" until released, to
    /// hold a pass open.
    #[derive(Default)]
    struct GatedTransport {
        entered: Notify,
        release: Notify,
        delivered: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl MutationTransport for GatedTransport {
        async fn deliver(&self, record: &PendingRecord) -> ClientResult<()> {
            let tag = record.payload["tag"].as_str().unwrap_or_default().to_string();
            if tag == "a" {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.delivered.lock().unwrap().push(tag);
            Ok(())
        }
    }

    async fn gated_queue(transport: Arc<GatedTransport>) -> Arc<OfflineQueue> {
        OfflineQueue::open(
            Arc::new(InMemoryStore::default()),
            transport,
            Arc::new(FixedClock(now())),
            false,
        )
        .await
    }

    #[tokio::test]
    async fn concurrent_sync_is_a_no_op() {
        let transport = Arc::new(GatedTransport::default());
        let queue = gated_queue(transport.clone()).await;
        enqueue_tagged(&queue, &["a"]).await;
        queue.set_online(true);

        let first = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.sync_all().await })
        };
        transport.entered.notified().await;

        assert_eq!(queue.sync_all().await, SyncReport::default());

        transport.release.notify_one();
        let report = first.await.unwrap();
        assert_eq!(report, SyncReport { attempted: 1, succeeded: 1 });
    }

    #[tokio::test]
    async fn records_queued_during_a_pass_are_sent_by_that_pass() {
        let transport = Arc::new(GatedTransport::default());
        let queue = gated_queue(transport.clone()).await;
        enqueue_tagged(&queue, &["a"]).await;
        queue.set_online(true);

        let first = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.sync_all().await })
        };
        transport.entered.notified().await;

        enqueue_tagged(&queue, &["b"]).await;
        assert_eq!(queue.sync_all().await, SyncReport::default());

        transport.release.notify_one();
        let report = first.await.unwrap();
        assert_eq!(report, SyncReport { attempted: 2, succeeded: 2 });
        assert_eq!(*transport.delivered.lock().unwrap(), vec!["a", "b"]);
        assert!(queue.pending().await.is_empty());
    }

    #[tokio::test]
    async fn a_failed_record_is_tried_once_per_pass_even_when_rerun() {
        let transport = Arc::new(ScriptedTransport::failing(&["x"]));
        let (queue, _) = offline_queue(transport.clone()).await;
        enqueue_tagged(&queue, &["x"]).await;
        queue.set_online(true);
        queue.rerun.store(true, Ordering::Release);

        let report = queue.sync_all().await;

        assert_eq!(report, SyncReport { attempted: 1, succeeded: 0 });
        assert_eq!(queue.pending().await[0].retry_count, 1);
    }

    /// Loads fine, refuses every write.
    struct ReadOnlyStore(QueueDocument);

    #[async_trait]
    impl QueueStore for ReadOnlyStore {
        async fn load(&self) -> ClientResult<QueueDocument> {
            Ok(self.0.clone())
        }

        async fn save(&self, _document: &QueueDocument) -> ClientResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[tokio::test]
    async fn a_record_that_cannot_be_saved_is_not_queued() {
        let transport = Arc::new(ScriptedTransport::default());
        let queue = OfflineQueue::open(
            Arc::new(ReadOnlyStore(QueueDocument::default())),
            transport.clone(),
            Arc::new(FixedClock(now())),
            false,
        )
        .await;

        let result = queue
            .enqueue(MutationKind::CreateCatch, json!({ "tag": "lost" }))
            .await;

        assert!(matches!(result, Err(ClientError::Storage(_))));
        assert!(queue.pending().await.is_empty());
        queue.set_online(true);
        assert_eq!(queue.sync_all().await, SyncReport::default());
        assert!(transport.delivered().is_empty());
    }

    #[tokio::test]
    async fn a_failed_clear_keeps_the_records() {
        let saved = QueueDocument {
            records: vec![PendingRecord {
                id: Uuid::new_v4(),
                kind: MutationKind::CreateCatch,
                payload: json!({ "tag": "kept" }),
                created_at: now(),
                synced: false,
                retry_count: 0,
            }],
            last_sync: Some(now()),
        };
        let queue = OfflineQueue::open(
            Arc::new(ReadOnlyStore(saved.clone())),
            Arc::new(ScriptedTransport::default()),
            Arc::new(FixedClock(now())),
            false,
        )
        .await;

        assert!(queue.clear().await.is_err());
        assert_eq!(queue.pending().await, saved.records);
        assert_eq!(queue.last_sync().await, Some(now()));
    }

    #[tokio::test]
    async fn enqueue_while_online_syncs_in_background() {
        let transport = Arc::new(ScriptedTransport::default());
        let (queue, _) = offline_queue(transport.clone()).await;
        queue.set_online(true);

        enqueue_tagged(&queue, &["now"]).await;

        for _ in 0..100 {
            if queue.pending().await.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(queue.pending().await.is_empty());
        assert_eq!(transport.delivered(), vec!["now"]);
    }
}
