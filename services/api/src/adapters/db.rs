//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use anglerhub_core::criteria::GoalCriteria;
use anglerhub_core::domain::{
    Catch, CatchDetails, Goal, GoalDraft, GoalStatus, GoalType, NewUser, ProfileUpdate, User,
    UserCredentials, WeatherLog, WeatherReading,
};
use anglerhub_core::geo::BoundingBox;
use anglerhub_core::ports::{DatabaseService, PortError, PortResult};
use anglerhub_core::query::{CatchFilter, GoalFilter, Page, PageRequest, SortOrder, WeatherFilter};
use anglerhub_core::units::UserPreferences;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

const USER_COLUMNS: &str =
    "id, name, email, avatar, bio, location, preferences, is_active, created_at";

const CATCH_COLUMNS: &str = "id, user_id, species, weight, length, location, latitude, \
     longitude, water_body, caught_at, bait_lure, technique, water_temp, air_temp, \
     weather_conditions, photos, notes, is_released, is_personal_best, created_at, updated_at";

const GOAL_COLUMNS: &str = "id, user_id, title, description, type AS goal_type, criteria, \
     target_value, current_value, start_date, target_date, completed_at, status, is_public, \
     created_at, updated_at";

const WEATHER_COLUMNS: &str = "id, user_id, latitude, longitude, location_name, temperature, \
     feels_like, humidity, pressure, wind_speed, wind_direction, weather_main, \
     weather_description, precipitation, cloud_cover, uv_index, visibility, recorded_at, \
     api_source, created_at";

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(
    what: &str,
    id: impl std::fmt::Display,
) -> impl FnOnce(sqlx::Error) -> PortError {
    let what = format!("{} {} not found", what, id);
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

/// Escapes `LIKE` wildcards and wraps the needle for a substring match.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn order_clause(column: &str, order: SortOrder) -> String {
    // Matches the in-memory ordering: missing values first when ascending.
    let nulls = match order {
        SortOrder::Asc => "NULLS FIRST",
        SortOrder::Desc => "NULLS LAST",
    };
    format!(" ORDER BY {} {} {}, id ASC", column, order.as_sql(), nulls)
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    qb.push(" LIMIT ")
        .push_bind(i64::from(page.per_page))
        .push(" OFFSET ")
        .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    avatar: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    preferences: Json<UserPreferences>,
    is_active: bool,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            avatar: self.avatar,
            bio: self.bio,
            location: self.location,
            preferences: self.preferences.0,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
    is_active: bool,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            hashed_password: self.hashed_password,
            is_active: self.is_active,
        }
    }
}

#[derive(FromRow)]
struct CatchRecord {
    id: Uuid,
    user_id: Uuid,
    species: String,
    weight: Option<f64>,
    length: Option<f64>,
    location: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    water_body: Option<String>,
    caught_at: DateTime<Utc>,
    bait_lure: Option<String>,
    technique: Option<String>,
    water_temp: Option<f64>,
    air_temp: Option<f64>,
    weather_conditions: Option<String>,
    photos: Json<Vec<String>>,
    notes: Option<String>,
    is_released: bool,
    is_personal_best: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl CatchRecord {
    fn to_domain(self) -> Catch {
        Catch {
            id: self.id,
            user_id: self.user_id,
            details: CatchDetails {
                species: self.species,
                weight: self.weight,
                length: self.length,
                location: self.location,
                latitude: self.latitude,
                longitude: self.longitude,
                water_body: self.water_body,
                caught_at: self.caught_at,
                bait_lure: self.bait_lure,
                technique: self.technique,
                water_temp: self.water_temp,
                air_temp: self.air_temp,
                weather_conditions: self.weather_conditions,
                photos: self.photos.0,
                notes: self.notes,
                is_released: self.is_released,
                is_personal_best: self.is_personal_best,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct GoalRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    goal_type: String,
    criteria: Json<Value>,
    target_value: Option<i32>,
    current_value: i32,
    start_date: NaiveDate,
    target_date: NaiveDate,
    completed_at: Option<DateTime<Utc>>,
    status: String,
    is_public: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl GoalRecord {
    /// Fails only for rows the application could not have written.
    fn to_domain(self) -> PortResult<Goal> {
        let goal_type: GoalType = self
            .goal_type
            .parse()
            .map_err(|e| PortError::Unexpected(format!("goal {}: {}", self.id, e)))?;
        let status: GoalStatus = self
            .status
            .parse()
            .map_err(|e| PortError::Unexpected(format!("goal {}: {}", self.id, e)))?;
        let criteria = GoalCriteria::parse(goal_type, &self.criteria.0)
            .map_err(|e| PortError::Unexpected(format!("goal {} criteria: {}", self.id, e)))?;
        Ok(Goal {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            criteria,
            target_value: self.target_value,
            current_value: self.current_value,
            start_date: self.start_date,
            target_date: self.target_date,
            status,
            completed_at: self.completed_at,
            is_public: self.is_public,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct WeatherLogRecord {
    id: Uuid,
    user_id: Uuid,
    latitude: f64,
    longitude: f64,
    location_name: String,
    temperature: f64,
    feels_like: Option<f64>,
    humidity: i32,
    pressure: f64,
    wind_speed: Option<f64>,
    wind_direction: Option<i32>,
    weather_main: String,
    weather_description: String,
    precipitation: Option<f64>,
    cloud_cover: Option<i32>,
    uv_index: Option<f64>,
    visibility: Option<i32>,
    recorded_at: DateTime<Utc>,
    api_source: String,
    created_at: DateTime<Utc>,
}
impl WeatherLogRecord {
    fn to_domain(self) -> WeatherLog {
        WeatherLog {
            id: self.id,
            user_id: self.user_id,
            reading: WeatherReading {
                latitude: self.latitude,
                longitude: self.longitude,
                location_name: self.location_name,
                temperature: self.temperature,
                feels_like: self.feels_like,
                humidity: self.humidity,
                pressure: self.pressure,
                wind_speed: self.wind_speed,
                wind_direction: self.wind_direction,
                weather_main: self.weather_main,
                weather_description: self.weather_description,
                precipitation: self.precipitation,
                cloud_cover: self.cloud_cover,
                uv_index: self.uv_index,
                visibility: self.visibility,
                recorded_at: self.recorded_at,
                api_source: self.api_source,
            },
            created_at: self.created_at,
        }
    }
}

/// Unreadable rows are logged and left out, so one bad goal does not hide
/// or block the rest.
fn goals_to_domain(records: Vec<GoalRecord>) -> Vec<Goal> {
    records
        .into_iter()
        .filter_map(|record| match record.to_domain() {
            Ok(goal) => Some(goal),
            Err(e) => {
                warn!("Skipping unreadable goal row: {}", e);
                None
            }
        })
        .collect()
}

//=========================================================================================
// Filters
//=========================================================================================

fn push_catch_filter(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &CatchFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(species) = &filter.species {
        qb.push(" AND species ILIKE ")
            .push_bind(contains_pattern(species));
    }
    if let Some(location) = &filter.location {
        qb.push(" AND location ILIKE ")
            .push_bind(contains_pattern(location));
    }
    if let Some(range) = filter.caught_between {
        qb.push(" AND caught_at BETWEEN ")
            .push_bind(range.start)
            .push(" AND ")
            .push_bind(range.end);
    }
    if filter.personal_bests {
        qb.push(" AND is_personal_best");
    }
    if filter.released_only {
        qb.push(" AND is_released");
    }
}

fn push_goal_filter(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &GoalFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(goal_type) = filter.goal_type {
        qb.push(" AND type = ").push_bind(goal_type.as_str());
    }
    if filter.active_only {
        qb.push(" AND status = 'active'");
    }
    if filter.completed_only {
        qb.push(" AND status = 'completed'");
    }
    if filter.overdue_only {
        qb.push(" AND status = 'active' AND target_date < ")
            .push_bind(filter.today);
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- User Management ---
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, name, email, hashed_password, preferences) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.name)
            .bind(&new_user.email)
            .bind(&new_user.hashed_password)
            .bind(Json(&new_user.preferences))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    PortError::Conflict(format!("email {} is already registered", new_user.email))
                }
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("User", user_id))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password, is_active FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("User", email))?;
        Ok(record.to_domain())
    }

    async fn get_credentials(&self, user_id: Uuid) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("User", user_id))?;
        Ok(record.to_domain())
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), bio = COALESCE($3, bio), \
             location = COALESCE($4, location), avatar = COALESCE($5, avatar), \
             updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(&update.name)
            .bind(&update.bio)
            .bind(&update.location)
            .bind(&update.avatar)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("User", user_id))?;
        Ok(record.to_domain())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: &UserPreferences,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET preferences = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(Json(preferences))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        expect_row("User", user_id, result.rows_affected())
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET hashed_password = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(hashed_password)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        expect_row("User", user_id, result.rows_affected())
    }

    async fn deactivate_user(&self, user_id: Uuid, retired_email: &str) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET is_active = FALSE, email = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(retired_email)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        expect_row("User", user_id, result.rows_affected())
    }

    // --- Auth Tokens ---
    async fn create_auth_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_auth_sessions_for_user(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Catches ---
    async fn create_catch(&self, user_id: Uuid, details: &CatchDetails) -> PortResult<Catch> {
        let sql = format!(
            "INSERT INTO catches (id, user_id, species, weight, length, location, latitude, \
             longitude, water_body, caught_at, bait_lure, technique, water_temp, air_temp, \
             weather_conditions, photos, notes, is_released, is_personal_best) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19) RETURNING {CATCH_COLUMNS}"
        );
        let query = sqlx::query_as::<_, CatchRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id);
        let record = bind_catch(query, details)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_catch(&self, catch_id: Uuid) -> PortResult<Catch> {
        let sql = format!("SELECT {CATCH_COLUMNS} FROM catches WHERE id = $1");
        let record = sqlx::query_as::<_, CatchRecord>(&sql)
            .bind(catch_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("Catch", catch_id))?;
        Ok(record.to_domain())
    }

    async fn update_catch(&self, catch_id: Uuid, details: &CatchDetails) -> PortResult<Catch> {
        let sql = format!(
            "UPDATE catches SET species = $2, weight = $3, length = $4, location = $5, \
             latitude = $6, longitude = $7, water_body = $8, caught_at = $9, bait_lure = $10, \
             technique = $11, water_temp = $12, air_temp = $13, weather_conditions = $14, \
             photos = $15, notes = $16, is_released = $17, is_personal_best = $18, \
             updated_at = NOW() WHERE id = $1 RETURNING {CATCH_COLUMNS}"
        );
        let record = bind_catch(sqlx::query_as::<_, CatchRecord>(&sql).bind(catch_id), details)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("Catch", catch_id))?;
        Ok(record.to_domain())
    }

    async fn delete_catch(&self, catch_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM catches WHERE id = $1")
            .bind(catch_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_row("Catch", catch_id, result.rows_affected())
    }

    async fn list_catches(
        &self,
        user_id: Uuid,
        filter: &CatchFilter,
        page: PageRequest,
    ) -> PortResult<Page<Catch>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catches");
        push_catch_filter(&mut count, user_id, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        let mut rows =
            QueryBuilder::<Postgres>::new(format!("SELECT {CATCH_COLUMNS} FROM catches"));
        push_catch_filter(&mut rows, user_id, filter);
        rows.push(order_clause(filter.sort_by.column(), filter.sort_order));
        push_page(&mut rows, page);
        let records = rows
            .build_query_as::<CatchRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let data = records.into_iter().map(CatchRecord::to_domain).collect();
        Ok(Page::new(data, page, u64::try_from(total).unwrap_or(0)))
    }

    async fn catches_for_user(&self, user_id: Uuid) -> PortResult<Vec<Catch>> {
        let sql = format!(
            "SELECT {CATCH_COLUMNS} FROM catches WHERE user_id = $1 ORDER BY caught_at ASC, id ASC"
        );
        let records = sqlx::query_as::<_, CatchRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(CatchRecord::to_domain).collect())
    }

    async fn catches_within(
        &self,
        user_id: Uuid,
        bounds: &BoundingBox,
        limit: u32,
    ) -> PortResult<Vec<Catch>> {
        let sql = format!(
            "SELECT {CATCH_COLUMNS} FROM catches WHERE user_id = $1 \
             AND latitude BETWEEN $2 AND $3 AND longitude BETWEEN $4 AND $5 \
             ORDER BY caught_at DESC LIMIT $6"
        );
        let records = sqlx::query_as::<_, CatchRecord>(&sql)
            .bind(user_id)
            .bind(bounds.min_latitude)
            .bind(bounds.max_latitude)
            .bind(bounds.min_longitude)
            .bind(bounds.max_longitude)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(CatchRecord::to_domain).collect())
    }

    // --- Goals ---
    async fn create_goal(&self, user_id: Uuid, draft: &GoalDraft) -> PortResult<Goal> {
        let sql = format!(
            "INSERT INTO goals (id, user_id, title, description, type, criteria, target_value, \
             start_date, target_date, is_public) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {GOAL_COLUMNS}"
        );
        let record = sqlx::query_as::<_, GoalRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(draft.criteria.goal_type().as_str())
            .bind(Json(draft.criteria.to_document()))
            .bind(draft.target_value)
            .bind(draft.start_date)
            .bind(draft.target_date)
            .bind(draft.is_public)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_goal(&self, goal_id: Uuid) -> PortResult<Goal> {
        let sql = format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = $1");
        let record = sqlx::query_as::<_, GoalRecord>(&sql)
            .bind(goal_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("Goal", goal_id))?;
        record.to_domain()
    }

    async fn update_goal(&self, goal: &Goal) -> PortResult<Goal> {
        let sql = format!(
            "UPDATE goals SET title = $2, description = $3, type = $4, criteria = $5, \
             target_value = $6, current_value = $7, start_date = $8, target_date = $9, \
             completed_at = $10, status = $11, is_public = $12, updated_at = $13 \
             WHERE id = $1 RETURNING {GOAL_COLUMNS}"
        );
        let record = sqlx::query_as::<_, GoalRecord>(&sql)
            .bind(goal.id)
            .bind(&goal.title)
            .bind(&goal.description)
            .bind(goal.criteria.goal_type().as_str())
            .bind(Json(goal.criteria.to_document()))
            .bind(goal.target_value)
            .bind(goal.current_value)
            .bind(goal.start_date)
            .bind(goal.target_date)
            .bind(goal.completed_at)
            .bind(goal.status.as_str())
            .bind(goal.is_public)
            .bind(goal.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected("Goal", goal.id))?;
        record.to_domain()
    }

    async fn delete_goal(&self, goal_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1")
            .bind(goal_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        expect_row("Goal", goal_id, result.rows_affected())
    }

    async fn list_goals(
        &self,
        user_id: Uuid,
        filter: &GoalFilter,
        page: PageRequest,
    ) -> PortResult<Page<Goal>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM goals");
        push_goal_filter(&mut count, user_id, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        let mut rows = QueryBuilder::<Postgres>::new(format!("SELECT {GOAL_COLUMNS} FROM goals"));
        push_goal_filter(&mut rows, user_id, filter);
        rows.push(order_clause(filter.sort_by.column(), filter.sort_order));
        push_page(&mut rows, page);
        let records = rows
            .build_query_as::<GoalRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(Page::new(
            goals_to_domain(records),
            page,
            u64::try_from(total).unwrap_or(0),
        ))
    }

    async fn goals_for_user(&self, user_id: Uuid) -> PortResult<Vec<Goal>> {
        let sql = format!(
            "SELECT {GOAL_COLUMNS} FROM goals WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let records = sqlx::query_as::<_, GoalRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(goals_to_domain(records))
    }

    // --- Weather Logs ---
    async fn create_weather_log(
        &self,
        user_id: Uuid,
        reading: &WeatherReading,
    ) -> PortResult<WeatherLog> {
        let sql = format!(
            "INSERT INTO weather_logs (id, user_id, latitude, longitude, location_name, \
             temperature, feels_like, humidity, pressure, wind_speed, wind_direction, \
             weather_main, weather_description, precipitation, cloud_cover, uv_index, \
             visibility, recorded_at, api_source) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19) RETURNING {WEATHER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, WeatherLogRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(reading.latitude)
            .bind(reading.longitude)
            .bind(&reading.location_name)
            .bind(reading.temperature)
            .bind(reading.feels_like)
            .bind(reading.humidity)
            .bind(reading.pressure)
            .bind(reading.wind_speed)
            .bind(reading.wind_direction)
            .bind(&reading.weather_main)
            .bind(&reading.weather_description)
            .bind(reading.precipitation)
            .bind(reading.cloud_cover)
            .bind(reading.uv_index)
            .bind(reading.visibility)
            .bind(reading.recorded_at)
            .bind(&reading.api_source)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_weather_logs(
        &self,
        user_id: Uuid,
        filter: &WeatherFilter,
    ) -> PortResult<Vec<WeatherLog>> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {WEATHER_COLUMNS} FROM weather_logs"));
        qb.push(" WHERE user_id = ").push_bind(user_id);
        if let Some(location) = &filter.location_name {
            qb.push(" AND location_name ILIKE ")
                .push_bind(contains_pattern(location));
        }
        if let Some(range) = filter.recorded_between {
            qb.push(" AND recorded_at BETWEEN ")
                .push_bind(range.start)
                .push(" AND ")
                .push_bind(range.end);
        }
        qb.push(" ORDER BY recorded_at DESC LIMIT ")
            .push_bind(i64::from(filter.limit));

        let records = qb
            .build_query_as::<WeatherLogRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(WeatherLogRecord::to_domain).collect())
    }

    async fn previous_weather_log(
        &self,
        user_id: Uuid,
        location_name: &str,
        before: DateTime<Utc>,
    ) -> PortResult<Option<WeatherLog>> {
        let sql = format!(
            "SELECT {WEATHER_COLUMNS} FROM weather_logs \
             WHERE user_id = $1 AND location_name = $2 AND recorded_at < $3 \
             ORDER BY recorded_at DESC LIMIT 1"
        );
        let record = sqlx::query_as::<_, WeatherLogRecord>(&sql)
            .bind(user_id)
            .bind(location_name)
            .bind(before)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(WeatherLogRecord::to_domain))
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

type CatchQuery<'q> =
    sqlx::query::QueryAs<'q, Postgres, CatchRecord, sqlx::postgres::PgArguments>;

/// Binds the catch columns in table order, after whatever keys the caller bound.
fn bind_catch<'q>(query: CatchQuery<'q>, d: &'q CatchDetails) -> CatchQuery<'q> {
    query
        .bind(&d.species)
        .bind(d.weight)
        .bind(d.length)
        .bind(&d.location)
        .bind(d.latitude)
        .bind(d.longitude)
        .bind(&d.water_body)
        .bind(d.caught_at)
        .bind(&d.bait_lure)
        .bind(&d.technique)
        .bind(d.water_temp)
        .bind(d.air_temp)
        .bind(&d.weather_conditions)
        .bind(Json(&d.photos))
        .bind(&d.notes)
        .bind(d.is_released)
        .bind(d.is_personal_best)
}

fn expect_row(what: &str, id: Uuid, rows_affected: u64) -> PortResult<()> {
    if rows_affected == 0 {
        Err(PortError::NotFound(format!("{} {} not found", what, id)))
    } else {
        Ok(())
    }
}
