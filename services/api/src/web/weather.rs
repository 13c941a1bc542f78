//! services/api/src/web/weather.rs
//!
//! Weather log endpoints. Listed logs carry insights derived with the owner's
//! display preferences and the previous log at the same location.

use anglerhub_core::domain::{WeatherLog, WeatherReading};
use anglerhub_core::query::{WeatherFilter, DEFAULT_WEATHER_LIMIT};
use anglerhub_core::validation::ValidationErrors;
use anglerhub_core::weather::WeatherInsights;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::web::extract::{self, JsonBody, QueryParams};
use crate::web::state::{AppState, AuthUser};

pub const MAX_WEATHER_LIMIT: u32 = 100;
const DEFAULT_API_SOURCE: &str = "openweathermap";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WeatherLogRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
    /// Degrees Celsius.
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    /// Percent.
    pub humidity: Option<i32>,
    /// Hectopascal.
    pub pressure: Option<f64>,
    /// Metres per second.
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<i32>,
    pub weather_main: Option<String>,
    pub weather_description: Option<String>,
    /// Millimetres.
    pub precipitation: Option<f64>,
    pub cloud_cover: Option<i32>,
    pub uv_index: Option<f64>,
    /// Metres.
    pub visibility: Option<i32>,
    /// Defaults to the time of the request.
    pub recorded_at: Option<String>,
    pub api_source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeatherListQuery {
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct WeatherLogResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub weather_log: WeatherLog,
}

#[derive(Serialize)]
pub struct WeatherLogView {
    #[serde(flatten)]
    pub log: WeatherLog,
    #[serde(flatten)]
    pub insights: WeatherInsights,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /weather-logs - Recent logs, newest first, with derived insights
#[utoipa::path(
    get,
    path = "/api/weather-logs",
    params(
        ("location" = Option<String>, Query, description = "Case-insensitive location substring."),
        ("start_date" = Option<String>, Query, description = "First day, used together with end_date."),
        ("end_date" = Option<String>, Query, description = "Last day, used together with start_date."),
        ("limit" = Option<u32>, Query, description = "At most this many logs, default 50, max 100.")
    ),
    responses((status = 200, description = "Weather logs"))
)]
pub async fn list_weather_logs_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    QueryParams(query): QueryParams<WeatherListQuery>,
) -> AppResult<Json<Vec<WeatherLogView>>> {
    let filter = WeatherFilter {
        location_name: query
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        recorded_between: extract::day_range(
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )?,
        limit: query
            .limit
            .unwrap_or(DEFAULT_WEATHER_LIMIT)
            .clamp(1, MAX_WEATHER_LIMIT),
    };
    let preferences = state.db.get_user(auth.user_id).await?.preferences;
    let logs = state.db.list_weather_logs(auth.user_id, &filter).await?;

    let mut views = Vec::with_capacity(logs.len());
    for log in logs {
        let previous = state
            .db
            .previous_weather_log(
                auth.user_id,
                &log.reading.location_name,
                log.reading.recorded_at,
            )
            .await?;
        let insights = WeatherInsights::derive(&log, previous.as_ref(), &preferences);
        views.push(WeatherLogView { log, insights });
    }
    Ok(Json(views))
}

/// POST /weather-logs - Record a weather snapshot
#[utoipa::path(
    post,
    path = "/api/weather-logs",
    request_body = WeatherLogRequest,
    responses(
        (status = 201, description = "Weather logged", body = WeatherLogResponse),
        (status = 422, description = "Invalid reading")
    )
)]
pub async fn create_weather_log_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<WeatherLogRequest>,
) -> AppResult<impl IntoResponse> {
    let reading = req.into_reading(state.clock.utc())?;
    let weather_log = state.db.create_weather_log(auth.user_id, &reading).await?;
    info!(
        "User {} logged weather at {}",
        auth.user_id, weather_log.reading.location_name
    );
    Ok((
        StatusCode::CREATED,
        Json(WeatherLogResponse {
            message: "Weather logged successfully".to_string(),
            weather_log,
        }),
    ))
}

//=========================================================================================
// Validation
//=========================================================================================

impl WeatherLogRequest {
    pub fn into_reading(self, now: DateTime<Utc>) -> Result<WeatherReading, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let latitude = required_number(&mut errors, "latitude", self.latitude, -90.0, 90.0);
        let longitude = required_number(&mut errors, "longitude", self.longitude, -180.0, 180.0);
        let temperature =
            required_number(&mut errors, "temperature", self.temperature, -90.0, 60.0);
        let pressure = required_number(&mut errors, "pressure", self.pressure, 800.0, 1100.0);
        required_number(
            &mut errors,
            "humidity",
            self.humidity.map(f64::from),
            0.0,
            100.0,
        );

        let location_name = required_text(&mut errors, "location_name", self.location_name);
        let weather_main = required_text(&mut errors, "weather_main", self.weather_main);
        errors.max_len("weather_description", self.weather_description.as_deref(), 255);

        errors.between("feels_like", self.feels_like, -90.0, 60.0);
        errors.between("wind_speed", self.wind_speed, 0.0, 150.0);
        errors.between("wind_direction", self.wind_direction.map(f64::from), 0.0, 360.0);
        errors.between("precipitation", self.precipitation, 0.0, 1000.0);
        errors.between("cloud_cover", self.cloud_cover.map(f64::from), 0.0, 100.0);
        errors.between("uv_index", self.uv_index, 0.0, 20.0);
        errors.between("visibility", self.visibility.map(f64::from), 0.0, 100_000.0);

        let recorded_at = match self.recorded_at.as_deref() {
            Some(raw) => extract::timestamp_field(&mut errors, "recorded_at", Some(raw)),
            None => Some(now),
        };

        let (
            Some(latitude),
            Some(longitude),
            Some(temperature),
            Some(pressure),
            Some(humidity),
            Some(recorded_at),
        ) = (
            latitude,
            longitude,
            temperature,
            pressure,
            self.humidity,
            recorded_at,
        )
        else {
            return Err(errors);
        };
        errors.into_result()?;

        Ok(WeatherReading {
            latitude,
            longitude,
            location_name,
            temperature,
            feels_like: self.feels_like,
            humidity,
            pressure,
            wind_speed: self.wind_speed,
            wind_direction: self.wind_direction,
            weather_main,
            weather_description: self.weather_description.unwrap_or_default(),
            precipitation: self.precipitation,
            cloud_cover: self.cloud_cover,
            uv_index: self.uv_index,
            visibility: self.visibility,
            recorded_at,
            api_source: self
                .api_source
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_SOURCE.to_string()),
        })
    }
}

fn required_number(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Option<f64> {
    match value {
        None => {
            errors.add(field, format!("The {field} field is required."));
            None
        }
        Some(value) => {
            errors.between(field, Some(value), min, max);
            Some(value)
        }
    }
}

fn required_text(errors: &mut ValidationErrors, field: &str, value: Option<String>) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    errors.required(field, &value);
    errors.max_len(field, Some(&value), 255);
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 4, 6, 0, 0).unwrap()
    }

    #[test]
    fn minimal_reading_gets_defaults() {
        let req: WeatherLogRequest = serde_json::from_value(json!({
            "latitude": 45.0,
            "longitude": -93.0,
            "location_name": "Lake Harriet",
            "temperature": 21.0,
            "humidity": 60,
            "pressure": 1015.0,
            "weather_main": "Clouds"
        }))
        .unwrap();
        let reading = req.into_reading(now()).unwrap();
        assert_eq!(reading.recorded_at, now());
        assert_eq!(reading.api_source, "openweathermap");
        assert_eq!(reading.weather_description, "");
    }

    #[test]
    fn missing_and_out_of_range_fields_are_reported() {
        let req: WeatherLogRequest = serde_json::from_value(json!({
            "latitude": 95.0,
            "location_name": "Lake Harriet",
            "temperature": 21.0,
            "humidity": 160,
            "pressure": 1015.0,
            "wind_direction": 400,
            "weather_main": "Clouds"
        }))
        .unwrap();
        let errors = req.into_reading(now()).unwrap_err();
        for field in ["latitude", "longitude", "humidity", "wind_direction"] {
            assert!(errors.contains(field), "expected an error for {field}");
        }
    }
}
