//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use anglerhub_core::ports::{DatabaseService, PhotoStorage};
use anglerhub_core::tracker::ProgressTracker;
use chrono::NaiveDate;
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub photos: Arc<dyn PhotoStorage>,
    pub tracker: Arc<ProgressTracker>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the progress tracker to the same database and clock.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        photos: Arc<dyn PhotoStorage>,
        clock: Arc<dyn Clock>,
        config: Arc<Config>,
    ) -> Self {
        let tracker = Arc::new(ProgressTracker::new(db.clone(), clock.clone()));
        Self {
            db,
            photos,
            tracker,
            clock,
            config,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.utc().date_naive()
    }

    /// Re-evaluates the user's goals after their catches changed. The catch
    /// write has already succeeded, so a failure here is logged, not returned.
    pub async fn refresh_goals(&self, user_id: Uuid) {
        match self.tracker.refresh_user_goals(user_id).await {
            Ok(summary) => debug!(
                "Refreshed goals for user {}: {} active, {} updated, {} completed",
                user_id, summary.active, summary.updated, summary.completed
            ),
            Err(e) => warn!("Failed to refresh goals for user {}: {}", user_id, e),
        }
    }
}

//=========================================================================================
// Per-request identity
//=========================================================================================

/// Inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    /// The token the request was authenticated with.
    pub token: String,
}
