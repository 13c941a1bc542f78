//! crates/anglerhub_core/src/tracker.rs
//!
//! Runs goal evaluation against the database. Every load-evaluate-write
//! sequence for a user happens under that user's lock, so concurrent catch
//! submissions cannot interleave and leave a stale counter behind.

use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Goal, GoalStatus};
use crate::ports::{DatabaseService, PortResult};
use crate::progress;

/// Result of re-evaluating all of a user's goals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Goals that were active when the pass started.
    pub active: usize,
    /// Goals written back because their progress or status changed.
    pub updated: usize,
    /// Goals that became completed during the pass.
    pub completed: usize,
}

pub struct ProgressTracker {
    db: Arc<dyn DatabaseService>,
    clock: Arc<dyn Clock>,
    user_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProgressTracker {
    pub fn new(db: Arc<dyn DatabaseService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Re-evaluates every goal owned by `user_id`. Paused and cancelled goals
    /// are skipped by the evaluator.
    pub async fn refresh_user_goals(&self, user_id: Uuid) -> PortResult<RefreshSummary> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let catches = self.db.catches_for_user(user_id).await?;
        let goals = self.db.goals_for_user(user_id).await?;
        let now = self.clock.utc();

        let mut summary = RefreshSummary::default();
        for mut goal in goals {
            if goal.status == GoalStatus::Active {
                summary.active += 1;
            }
            let evaluation = progress::evaluate(&goal, &catches, now);
            if !evaluation.changes(&goal) {
                continue;
            }
            let newly_completed =
                goal.status != GoalStatus::Completed && evaluation.status == GoalStatus::Completed;
            evaluation.apply_to(&mut goal);
            goal.updated_at = now;
            self.db.update_goal(&goal).await?;
            summary.updated += 1;
            if newly_completed {
                summary.completed += 1;
                info!(goal_id = %goal.id, %user_id, "Goal completed");
            }
        }
        debug!(%user_id, ?summary, "Refreshed goal progress");
        Ok(summary)
    }

    /// Re-evaluates a single goal, reading it fresh under the owner's lock.
    pub async fn refresh_goal(&self, goal_id: Uuid) -> PortResult<Goal> {
        let user_id = self.db.get_goal(goal_id).await?.user_id;
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut goal = self.db.get_goal(goal_id).await?;
        let catches = self.db.catches_for_user(user_id).await?;
        let now = self.clock.utc();

        let evaluation = progress::evaluate(&goal, &catches, now);
        if !evaluation.changes(&goal) {
            return Ok(goal);
        }
        if goal.status != GoalStatus::Completed && evaluation.status == GoalStatus::Completed {
            info!(goal_id = %goal.id, %user_id, "Goal completed");
        }
        evaluation.apply_to(&mut goal);
        goal.updated_at = now;
        self.db.update_goal(&goal).await
    }

    /// Runs `f` while holding the owner's evaluation lock, so explicit status
    /// changes cannot race with a concurrent refresh.
    pub async fn with_user_lock<F, Fut, T>(&self, user_id: Uuid, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        f().await
    }

    fn user_lock(&self, user_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Drop locks nobody is holding or waiting on.
        locks.retain(|id, lock| *id == user_id || Arc::strong_count(lock) > 1);
        locks.entry(user_id).or_default().clone()
    }
}
