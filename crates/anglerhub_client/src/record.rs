//! crates/anglerhub_client/src/record.rs
//!
//! The persisted shape of the offline queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// The mutations that may be queued while offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    CreateCatch,
    CreateGoal,
    UpdateProfile,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateCatch => "create_catch",
            Self::CreateGoal => "create_goal",
            Self::UpdateProfile => "update_profile",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub id: Uuid,
    pub kind: MutationKind,
    /// Request body, exactly as the caller would have sent it.
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub retry_count: u32,
}

/// Everything the queue persists, written as a single JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueDocument {
    #[serde(default)]
    pub records: Vec<PendingRecord>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}
