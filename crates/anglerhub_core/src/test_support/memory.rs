use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::domain::{
    Catch, CatchDetails, Goal, GoalDraft, GoalStatus, NewUser, ProfileUpdate, User,
    UserCredentials, WeatherLog, WeatherReading,
};
use crate::geo::BoundingBox;
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::query::{CatchFilter, GoalFilter, Page, PageRequest, WeatherFilter};
use crate::units::UserPreferences;

struct StoredUser {
    user: User,
    hashed_password: String,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, StoredUser>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    catches: HashMap<Uuid, Catch>,
    goals: HashMap<Uuid, Goal>,
    weather_logs: HashMap<Uuid, WeatherLog>,
}

/// A `DatabaseService` backed by hash maps, for tests and local experiments.
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    clock: Arc<dyn Clock>,
    goal_writes: Mutex<usize>,
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl InMemoryDatabase {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            clock,
            goal_writes: Mutex::new(0),
        }
    }

    /// Number of `update_goal` calls seen so far.
    pub fn goal_writes(&self) -> usize {
        *self.goal_writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a catch as-is, bypassing validation and timestamps.
    pub fn insert_catch(&self, catch: Catch) {
        self.tables().catches.insert(catch.id, catch);
    }

    /// Inserts a goal as-is.
    pub fn insert_goal(&self, goal: Goal) {
        self.tables().goals.insert(goal.id, goal);
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> PortError {
    PortError::NotFound(format!("{what} {id} not found"))
}

fn credentials(stored: &StoredUser) -> UserCredentials {
    UserCredentials {
        user_id: stored.user.id,
        email: stored.user.email.clone(),
        hashed_password: stored.hashed_password.clone(),
        is_active: stored.user.is_active,
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let now = self.now();
        let mut tables = self.tables();
        if tables
            .users
            .values()
            .any(|u| u.user.email.eq_ignore_ascii_case(&new_user.email))
        {
            return Err(PortError::Conflict(format!(
                "email {} is already registered",
                new_user.email
            )));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            avatar: None,
            bio: None,
            location: None,
            preferences: new_user.preferences,
            is_active: true,
            created_at: now,
        };
        tables.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                hashed_password: new_user.hashed_password,
            },
        );
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.tables()
            .users
            .get(&user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| not_found("user", user_id))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables()
            .users
            .values()
            .find(|u| u.user.email.eq_ignore_ascii_case(email))
            .map(credentials)
            .ok_or_else(|| not_found("user", email))
    }

    async fn get_credentials(&self, user_id: Uuid) -> PortResult<UserCredentials> {
        self.tables()
            .users
            .get(&user_id)
            .map(credentials)
            .ok_or_else(|| not_found("user", user_id))
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> PortResult<User> {
        let mut tables = self.tables();
        let stored = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| not_found("user", user_id))?;
        let user = &mut stored.user;
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if update.bio.is_some() {
            user.bio = update.bio.clone();
        }
        if update.location.is_some() {
            user.location = update.location.clone();
        }
        if update.avatar.is_some() {
            user.avatar = update.avatar.clone();
        }
        Ok(user.clone())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: &UserPreferences,
    ) -> PortResult<()> {
        let mut tables = self.tables();
        let stored = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| not_found("user", user_id))?;
        stored.user.preferences = preferences.clone();
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()> {
        let mut tables = self.tables();
        let stored = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| not_found("user", user_id))?;
        stored.hashed_password = hashed_password.to_string();
        Ok(())
    }

    async fn deactivate_user(&self, user_id: Uuid, retired_email: &str) -> PortResult<()> {
        let mut tables = self.tables();
        let stored = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| not_found("user", user_id))?;
        stored.user.is_active = false;
        stored.user.email = retired_email.to_string();
        Ok(())
    }

    async fn create_auth_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables()
            .sessions
            .insert(token.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid> {
        let now = self.now();
        match self.tables().sessions.get(token) {
            Some((user_id, expires_at)) if *expires_at > now => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, token: &str) -> PortResult<()> {
        self.tables().sessions.remove(token);
        Ok(())
    }

    async fn delete_auth_sessions_for_user(&self, user_id: Uuid) -> PortResult<()> {
        self.tables().sessions.retain(|_, (owner, _)| *owner != user_id);
        Ok(())
    }

    async fn create_catch(&self, user_id: Uuid, details: &CatchDetails) -> PortResult<Catch> {
        let now = self.now();
        let catch = Catch {
            id: Uuid::new_v4(),
            user_id,
            details: details.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables().catches.insert(catch.id, catch.clone());
        Ok(catch)
    }

    async fn get_catch(&self, catch_id: Uuid) -> PortResult<Catch> {
        self.tables()
            .catches
            .get(&catch_id)
            .cloned()
            .ok_or_else(|| not_found("catch", catch_id))
    }

    async fn update_catch(&self, catch_id: Uuid, details: &CatchDetails) -> PortResult<Catch> {
        let now = self.now();
        let mut tables = self.tables();
        let catch = tables
            .catches
            .get_mut(&catch_id)
            .ok_or_else(|| not_found("catch", catch_id))?;
        catch.details = details.clone();
        catch.updated_at = now;
        Ok(catch.clone())
    }

    async fn delete_catch(&self, catch_id: Uuid) -> PortResult<()> {
        self.tables()
            .catches
            .remove(&catch_id)
            .map(|_| ())
            .ok_or_else(|| not_found("catch", catch_id))
    }

    async fn list_catches(
        &self,
        user_id: Uuid,
        filter: &CatchFilter,
        page: PageRequest,
    ) -> PortResult<Page<Catch>> {
        let mut rows: Vec<Catch> = self
            .tables()
            .catches
            .values()
            .filter(|c| c.user_id == user_id && filter.matches(c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| filter.compare(a, b));
        Ok(Page::from_vec(rows, page))
    }

    async fn catches_for_user(&self, user_id: Uuid) -> PortResult<Vec<Catch>> {
        let mut rows: Vec<Catch> = self
            .tables()
            .catches
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| (c.details.caught_at, c.created_at));
        Ok(rows)
    }

    async fn catches_within(
        &self,
        user_id: Uuid,
        bounds: &BoundingBox,
        limit: u32,
    ) -> PortResult<Vec<Catch>> {
        let mut rows: Vec<Catch> = self
            .tables()
            .catches
            .values()
            .filter(|c| c.user_id == user_id)
            .filter(|c| c.coordinates().is_some_and(|p| bounds.contains(p)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.details.caught_at.cmp(&a.details.caught_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn create_goal(&self, user_id: Uuid, draft: &GoalDraft) -> PortResult<Goal> {
        let now = self.now();
        let goal = Goal {
            id: Uuid::new_v4(),
            user_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            criteria: draft.criteria.clone(),
            target_value: draft.target_value,
            current_value: 0,
            start_date: draft.start_date,
            target_date: draft.target_date,
            status: GoalStatus::Active,
            completed_at: None,
            is_public: draft.is_public,
            created_at: now,
            updated_at: now,
        };
        self.tables().goals.insert(goal.id, goal.clone());
        Ok(goal)
    }

    async fn get_goal(&self, goal_id: Uuid) -> PortResult<Goal> {
        self.tables()
            .goals
            .get(&goal_id)
            .cloned()
            .ok_or_else(|| not_found("goal", goal_id))
    }

    async fn update_goal(&self, goal: &Goal) -> PortResult<Goal> {
        let mut tables = self.tables();
        let stored = tables
            .goals
            .get_mut(&goal.id)
            .ok_or_else(|| not_found("goal", goal.id))?;
        *stored = goal.clone();
        *self.goal_writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(stored.clone())
    }

    async fn delete_goal(&self, goal_id: Uuid) -> PortResult<()> {
        self.tables()
            .goals
            .remove(&goal_id)
            .map(|_| ())
            .ok_or_else(|| not_found("goal", goal_id))
    }

    async fn list_goals(
        &self,
        user_id: Uuid,
        filter: &GoalFilter,
        page: PageRequest,
    ) -> PortResult<Page<Goal>> {
        let mut rows: Vec<Goal> = self
            .tables()
            .goals
            .values()
            .filter(|g| g.user_id == user_id && filter.matches(g))
            .cloned()
            .collect();
        rows.sort_by(|a, b| filter.compare(a, b));
        Ok(Page::from_vec(rows, page))
    }

    async fn goals_for_user(&self, user_id: Uuid) -> PortResult<Vec<Goal>> {
        let mut rows: Vec<Goal> = self
            .tables()
            .goals
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|g| g.created_at);
        Ok(rows)
    }

    async fn create_weather_log(
        &self,
        user_id: Uuid,
        reading: &WeatherReading,
    ) -> PortResult<WeatherLog> {
        let log = WeatherLog {
            id: Uuid::new_v4(),
            user_id,
            reading: reading.clone(),
            created_at: self.now(),
        };
        self.tables().weather_logs.insert(log.id, log.clone());
        Ok(log)
    }

    async fn list_weather_logs(
        &self,
        user_id: Uuid,
        filter: &WeatherFilter,
    ) -> PortResult<Vec<WeatherLog>> {
        let mut rows: Vec<WeatherLog> = self
            .tables()
            .weather_logs
            .values()
            .filter(|l| l.user_id == user_id && filter.matches(l))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.reading.recorded_at.cmp(&a.reading.recorded_at));
        rows.truncate(filter.limit as usize);
        Ok(rows)
    }

    async fn previous_weather_log(
        &self,
        user_id: Uuid,
        location_name: &str,
        before: DateTime<Utc>,
    ) -> PortResult<Option<WeatherLog>> {
        Ok(self
            .tables()
            .weather_logs
            .values()
            .filter(|l| l.user_id == user_id && l.reading.location_name == location_name)
            .filter(|l| l.reading.recorded_at < before)
            .max_by_key(|l| l.reading.recorded_at)
            .cloned())
    }
}
