//! crates/anglerhub_client/src/storage.rs
//!
//! Durable storage for the offline queue document.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::error::ClientResult;
use crate::record::QueueDocument;

#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Returns an empty document when nothing has been saved yet.
    async fn load(&self) -> ClientResult<QueueDocument>;

    /// Replaces the stored document.
    async fn save(&self, document: &QueueDocument) -> ClientResult<()>;
}

//=========================================================================================
// JSON file
//=========================================================================================

/// Keeps the document in one JSON file. Writes go to a sibling temp file that
/// is then renamed over the original, so a crash never leaves half a document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl QueueStore for JsonFileStore {
    async fn load(&self) -> ClientResult<QueueDocument> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(QueueDocument::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, document: &QueueDocument) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(document)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = %self.path.display(), records = document.records.len(), "Saved offline queue");
        Ok(())
    }
}

//=========================================================================================
// In memory
//=========================================================================================

/// Non-durable store, for tests and for callers that opt out of persistence.
#[derive(Default)]
pub struct InMemoryStore {
    document: Mutex<QueueDocument>,
}

impl InMemoryStore {
    pub fn new(document: QueueDocument) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }

    pub fn snapshot(&self) -> QueueDocument {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl QueueStore for InMemoryStore {
    async fn load(&self) -> ClientResult<QueueDocument> {
        Ok(self.snapshot())
    }

    async fn save(&self, document: &QueueDocument) -> ClientResult<()> {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = document.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MutationKind, PendingRecord};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("queue.json"));
        assert_eq!(store.load().await.unwrap(), QueueDocument::default());
    }

    #[tokio::test]
    async fn save_then_load_keeps_order_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("queue.json"));
        let at = Utc.with_ymd_and_hms(2024, 4, 1, 7, 30, 0).unwrap();
        let document = QueueDocument {
            records: vec![
                PendingRecord {
                    id: Uuid::new_v4(),
                    kind: MutationKind::CreateCatch,
                    payload: json!({"species": "Perch"}),
                    created_at: at,
                    synced: false,
                    retry_count: 1,
                },
                PendingRecord {
                    id: Uuid::new_v4(),
                    kind: MutationKind::UpdateProfile,
                    payload: json!({"bio": "out on the ice"}),
                    created_at: at,
                    synced: false,
                    retry_count: 0,
                },
            ],
            last_sync: Some(at),
        };

        store.save(&document).await.unwrap();
        assert_eq!(store.load().await.unwrap(), document);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(JsonFileStore::new(path).load().await.is_err());
    }
}
