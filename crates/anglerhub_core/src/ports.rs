//! crates/anglerhub_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or disks.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Catch, CatchDetails, Goal, GoalDraft, NewUser, ProfileUpdate, User, UserCredentials,
    WeatherLog, WeatherReading,
};
use crate::geo::BoundingBox;
use crate::query::{CatchFilter, GoalFilter, Page, PageRequest, WeatherFilter};
use crate::units::UserPreferences;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, disk).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    /// Fails with `Conflict` when the e-mail is already registered.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_credentials(&self, user_id: Uuid) -> PortResult<UserCredentials>;

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> PortResult<User>;

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: &UserPreferences,
    ) -> PortResult<()>;

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()>;

    /// Soft delete: the account is disabled and its e-mail replaced.
    async fn deactivate_user(&self, user_id: Uuid, retired_email: &str) -> PortResult<()>;

    // --- Auth Tokens ---
    async fn create_auth_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owning user, or `Unauthorized` for unknown or expired tokens.
    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, token: &str) -> PortResult<()>;

    async fn delete_auth_sessions_for_user(&self, user_id: Uuid) -> PortResult<()>;

    // --- Catches ---
    async fn create_catch(&self, user_id: Uuid, details: &CatchDetails) -> PortResult<Catch>;

    async fn get_catch(&self, catch_id: Uuid) -> PortResult<Catch>;

    async fn update_catch(&self, catch_id: Uuid, details: &CatchDetails) -> PortResult<Catch>;

    async fn delete_catch(&self, catch_id: Uuid) -> PortResult<()>;

    async fn list_catches(
        &self,
        user_id: Uuid,
        filter: &CatchFilter,
        page: PageRequest,
    ) -> PortResult<Page<Catch>>;

    /// The user's complete catch history, oldest first.
    async fn catches_for_user(&self, user_id: Uuid) -> PortResult<Vec<Catch>>;

    /// Positioned catches inside `bounds`, newest first.
    async fn catches_within(
        &self,
        user_id: Uuid,
        bounds: &BoundingBox,
        limit: u32,
    ) -> PortResult<Vec<Catch>>;

    // --- Goals ---
    /// Stores a new `active` goal with a zero counter.
    async fn create_goal(&self, user_id: Uuid, draft: &GoalDraft) -> PortResult<Goal>;

    async fn get_goal(&self, goal_id: Uuid) -> PortResult<Goal>;

    /// Writes every mutable column of `goal` back.
    async fn update_goal(&self, goal: &Goal) -> PortResult<Goal>;

    async fn delete_goal(&self, goal_id: Uuid) -> PortResult<()>;

    async fn list_goals(
        &self,
        user_id: Uuid,
        filter: &GoalFilter,
        page: PageRequest,
    ) -> PortResult<Page<Goal>>;

    async fn goals_for_user(&self, user_id: Uuid) -> PortResult<Vec<Goal>>;

    // --- Weather Logs ---
    async fn create_weather_log(
        &self,
        user_id: Uuid,
        reading: &WeatherReading,
    ) -> PortResult<WeatherLog>;

    /// Newest first, at most `filter.limit` entries.
    async fn list_weather_logs(
        &self,
        user_id: Uuid,
        filter: &WeatherFilter,
    ) -> PortResult<Vec<WeatherLog>>;

    /// The most recent log at the same location strictly before `before`.
    async fn previous_weather_log(
        &self,
        user_id: Uuid,
        location_name: &str,
        before: DateTime<Utc>,
    ) -> PortResult<Option<WeatherLog>>;
}

#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Persists an image uploaded by `owner` and returns the reference stored
    /// on catches.
    async fn store(&self, owner: Uuid, original_name: &str, data: Bytes) -> PortResult<String>;

    /// Whether `reference` names a photo uploaded by `owner`.
    fn is_owned_by(&self, reference: &str, owner: Uuid) -> bool;

    /// Removes a stored photo. Missing files are not an error.
    async fn delete(&self, reference: &str) -> PortResult<()>;
}
