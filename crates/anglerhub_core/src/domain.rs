//! crates/anglerhub_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! These structs are independent of any database; they derive `serde` so the
//! web layer can render them directly as JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::criteria::GoalCriteria;
use crate::geo::{self, Coordinates};
use crate::units::UserPreferences;

//=========================================================================================
// Users
//=========================================================================================

/// Represents a user - used throughout app. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub preferences: UserPreferences,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/password checks - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
}

/// The data needed to register a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub preferences: UserPreferences,
}

/// A partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar: Option<String>,
}

//=========================================================================================
// Catches
//=========================================================================================

/// One recorded fishing event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catch {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub details: CatchDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The user-editable part of a catch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatchDetails {
    pub species: String,
    pub weight: Option<f64>,
    pub length: Option<f64>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub water_body: Option<String>,
    pub caught_at: DateTime<Utc>,
    pub bait_lure: Option<String>,
    pub technique: Option<String>,
    pub water_temp: Option<f64>,
    pub air_temp: Option<f64>,
    pub weather_conditions: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_released: bool,
    #[serde(default)]
    pub is_personal_best: bool,
}

impl Catch {
    pub fn main_photo(&self) -> Option<&str> {
        self.details.photos.first().map(String::as_str)
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.details.latitude, self.details.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }

    /// Great-circle distance in kilometres, or `None` when the catch has no position.
    pub fn distance_to(&self, point: Coordinates) -> Option<f64> {
        self.coordinates()
            .map(|own| geo::haversine_km(own, point))
    }
}

//=========================================================================================
// Goals
//=========================================================================================

/// A user-defined target with typed criteria and tracked progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub criteria: GoalCriteria,
    pub target_value: Option<i32>,
    pub current_value: i32,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub status: GoalStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields supplied when a goal is created. Status and progress are never
/// user-supplied.
#[derive(Debug, Clone)]
pub struct GoalDraft {
    pub title: String,
    pub description: Option<String>,
    pub criteria: GoalCriteria,
    pub target_value: Option<i32>,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub is_public: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Species,
    Weight,
    Count,
    Location,
    Custom,
}

impl GoalType {
    pub const ALL: [GoalType; 5] = [
        GoalType::Species,
        GoalType::Weight,
        GoalType::Count,
        GoalType::Location,
        GoalType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Species => "species",
            Self::Weight => "weight",
            Self::Count => "count",
            Self::Location => "location",
            Self::Custom => "custom",
        }
    }

    /// Human readable label shown next to a goal.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Species => "Species Target",
            Self::Weight => "Weight Goal",
            Self::Count => "Catch Count",
            Self::Location => "Location Challenge",
            Self::Custom => "Custom Goal",
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Goal lifecycle: `active` may become `completed`, `paused` or `cancelled`;
/// `paused` may resume or be cancelled; `completed` and `cancelled` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl GoalStatus {
    pub const ALL: [GoalStatus; 4] = [
        GoalStatus::Active,
        GoalStatus::Completed,
        GoalStatus::Paused,
        GoalStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Paused => "Paused",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether an explicit status change from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: GoalStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Completed)
                | (Self::Active, Self::Paused)
                | (Self::Active, Self::Cancelled)
                | (Self::Paused, Self::Active)
                | (Self::Paused, Self::Cancelled)
        )
    }

    /// Frozen goals keep their counter untouched by progress evaluation.
    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Paused | Self::Cancelled)
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

//=========================================================================================
// Weather logs
//=========================================================================================

/// A point-in-time weather snapshot recorded by a user at a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherLog {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub reading: WeatherReading,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherReading {
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub temperature: f64,
    pub feels_like: Option<f64>,
    pub humidity: i32,
    pub pressure: f64,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<i32>,
    pub weather_main: String,
    pub weather_description: String,
    pub precipitation: Option<f64>,
    pub cloud_cover: Option<i32>,
    pub uv_index: Option<f64>,
    pub visibility: Option<i32>,
    pub recorded_at: DateTime<Utc>,
    #[serde(default = "default_api_source")]
    pub api_source: String,
}

fn default_api_source() -> String {
    "openweathermap".to_string()
}
