//! services/api/src/web/catches.rs
//!
//! Catch endpoints. Every mutation re-evaluates the owner's goals so progress
//! always reflects the current catch set.

use anglerhub_core::domain::{Catch, CatchDetails};
use anglerhub_core::geo::{BoundingBox, Coordinates};
use anglerhub_core::query::{CatchFilter, CatchSortField, Page, PageRequest, SortOrder};
use anglerhub_core::stats::CatchStatistics;
use anglerhub_core::validation::ValidationErrors;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::web::extract::{self, flag, present, JsonBody, QueryParams};
use crate::web::rest::MessageResponse;
use crate::web::state::{AppState, AuthUser};

pub const MAX_PHOTOS: usize = 5;
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 10.0;
pub const NEARBY_LIMIT: u32 = 50;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// Create and update payload. On update, omitted keys keep their stored value
/// and an explicit `null` clears a nullable one.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CatchRequest {
    pub species: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub length: Option<Option<f64>>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub water_body: Option<Option<String>>,
    /// RFC 3339 or `YYYY-MM-DD HH:MM:SS`.
    pub caught_at: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub bait_lure: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub technique: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub water_temp: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub air_temp: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub weather_conditions: Option<Option<String>>,
    /// References returned by the photo upload endpoint.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<Vec<String>>)]
    pub photos: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    pub is_released: Option<bool>,
    pub is_personal_best: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatchListQuery {
    pub species: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub personal_bests: bool,
    #[serde(default, deserialize_with = "flag")]
    pub released_only: bool,
    pub sort_by: Option<CatchSortField>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NearbyQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct CatchResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub catch: Catch,
}

/// A catch with its distance from the searched point.
#[derive(Serialize)]
pub struct NearbyCatch {
    #[serde(flatten)]
    pub catch: Catch,
    pub distance_km: f64,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /catches - The user's catches, filtered, sorted and paginated
#[utoipa::path(
    get,
    path = "/api/catches",
    params(
        ("species" = Option<String>, Query, description = "Case-insensitive species substring."),
        ("location" = Option<String>, Query, description = "Case-insensitive location substring."),
        ("start_date" = Option<String>, Query, description = "First day, used together with end_date."),
        ("end_date" = Option<String>, Query, description = "Last day, used together with start_date."),
        ("personal_bests" = Option<bool>, Query, description = "Only personal bests."),
        ("released_only" = Option<bool>, Query, description = "Only released fish."),
        ("sort_by" = Option<String>, Query, description = "caught_at, weight, length, species, location or created_at."),
        ("sort_order" = Option<String>, Query, description = "asc or desc."),
        ("page" = Option<u32>, Query, description = "1-based page."),
        ("per_page" = Option<u32>, Query, description = "Page size, at most 100.")
    ),
    responses(
        (status = 200, description = "A page of catches"),
        (status = 422, description = "Malformed filter")
    )
)]
pub async fn list_catches_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    QueryParams(query): QueryParams<CatchListQuery>,
) -> AppResult<Json<Page<Catch>>> {
    let filter = CatchFilter {
        species: non_blank(query.species),
        location: non_blank(query.location),
        caught_between: extract::day_range(query.start_date.as_deref(), query.end_date.as_deref())?,
        personal_bests: query.personal_bests,
        released_only: query.released_only,
        sort_by: query.sort_by.unwrap_or_default(),
        sort_order: query.sort_order.unwrap_or_default(),
    };
    let page = PageRequest::new(query.page, query.per_page);
    let catches = state.db.list_catches(auth.user_id, &filter, page).await?;
    Ok(Json(catches))
}

/// POST /catches - Record a catch
#[utoipa::path(
    post,
    path = "/api/catches",
    request_body = CatchRequest,
    responses(
        (status = 201, description = "Catch recorded", body = CatchResponse),
        (status = 422, description = "Invalid catch")
    )
)]
pub async fn create_catch_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<CatchRequest>,
) -> AppResult<impl IntoResponse> {
    let details = req.into_details(None)?;
    check_photo_owner(&state, &auth, &details, None)?;
    let catch = state.db.create_catch(auth.user_id, &details).await?;
    info!("User {} recorded catch {}", auth.user_id, catch.id);

    state.refresh_goals(auth.user_id).await;

    Ok((
        StatusCode::CREATED,
        Json(CatchResponse {
            message: "Catch recorded successfully".to_string(),
            catch,
        }),
    ))
}

/// GET /catches/{id} - One of the user's catches
#[utoipa::path(
    get,
    path = "/api/catches/{id}",
    params(("id" = Uuid, Path, description = "Catch id.")),
    responses(
        (status = 200, description = "The catch"),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such catch")
    )
)]
pub async fn show_catch_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(catch_id): Path<Uuid>,
) -> AppResult<Json<Catch>> {
    let catch = owned_catch(&state, &auth, catch_id).await?;
    Ok(Json(catch))
}

/// PUT /catches/{id} - Update a catch
#[utoipa::path(
    put,
    path = "/api/catches/{id}",
    params(("id" = Uuid, Path, description = "Catch id.")),
    request_body = CatchRequest,
    responses(
        (status = 200, description = "Catch updated", body = CatchResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such catch"),
        (status = 422, description = "Invalid catch")
    )
)]
pub async fn update_catch_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(catch_id): Path<Uuid>,
    JsonBody(req): JsonBody<CatchRequest>,
) -> AppResult<Json<CatchResponse>> {
    let existing = owned_catch(&state, &auth, catch_id).await?;
    let details = req.into_details(Some(&existing.details))?;
    check_photo_owner(&state, &auth, &details, Some(&existing.details))?;
    let catch = state.db.update_catch(catch_id, &details).await?;

    let dropped: Vec<&String> = existing
        .details
        .photos
        .iter()
        .filter(|p| !catch.details.photos.contains(*p))
        .collect();
    delete_photos(&state, &auth, dropped).await;

    state.refresh_goals(auth.user_id).await;

    Ok(Json(CatchResponse {
        message: "Catch updated successfully".to_string(),
        catch,
    }))
}

/// DELETE /catches/{id} - Delete a catch and its photos
#[utoipa::path(
    delete,
    path = "/api/catches/{id}",
    params(("id" = Uuid, Path, description = "Catch id.")),
    responses(
        (status = 200, description = "Catch deleted", body = MessageResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such catch")
    )
)]
pub async fn delete_catch_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(catch_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let catch = owned_catch(&state, &auth, catch_id).await?;
    state.db.delete_catch(catch_id).await?;
    delete_photos(&state, &auth, catch.details.photos.iter()).await;
    info!("User {} deleted catch {}", auth.user_id, catch_id);

    state.refresh_goals(auth.user_id).await;

    Ok(Json(MessageResponse::new("Catch deleted successfully")))
}

/// GET /catches/statistics - Aggregates over the user's catches
#[utoipa::path(
    get,
    path = "/api/catches/statistics",
    params(
        ("start_date" = Option<String>, Query, description = "First day, used together with end_date."),
        ("end_date" = Option<String>, Query, description = "Last day, used together with start_date.")
    ),
    responses((status = 200, description = "Catch statistics"))
)]
pub async fn catch_statistics_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    QueryParams(query): QueryParams<DateRangeQuery>,
) -> AppResult<Json<CatchStatistics>> {
    let range = extract::day_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let mut catches = state.db.catches_for_user(auth.user_id).await?;
    if let Some(range) = range {
        catches.retain(|c| range.contains(c.details.caught_at));
    }
    Ok(Json(CatchStatistics::compute(&catches)))
}

/// GET /catches/nearby - Catches within a radius of a point, newest first
#[utoipa::path(
    get,
    path = "/api/catches/nearby",
    params(
        ("latitude" = f64, Query, description = "Centre latitude."),
        ("longitude" = f64, Query, description = "Centre longitude."),
        ("radius" = Option<f64>, Query, description = "Radius in km, 1 to 100, default 10.")
    ),
    responses(
        (status = 200, description = "Nearby catches"),
        (status = 422, description = "Missing or out of range coordinates")
    )
)]
pub async fn nearby_catches_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    QueryParams(query): QueryParams<NearbyQuery>,
) -> AppResult<Json<Vec<NearbyCatch>>> {
    let mut errors = ValidationErrors::new();
    if query.latitude.is_none() {
        errors.add("latitude", "The latitude field is required.");
    }
    if query.longitude.is_none() {
        errors.add("longitude", "The longitude field is required.");
    }
    errors.between("latitude", query.latitude, -90.0, 90.0);
    errors.between("longitude", query.longitude, -180.0, 180.0);
    errors.between("radius", query.radius, 1.0, 100.0);

    let center = match (query.latitude, query.longitude) {
        (Some(latitude), Some(longitude)) if errors.is_empty() => {
            Coordinates::new(latitude, longitude)
        }
        _ => return Err(errors.into()),
    };
    let radius = query.radius.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);

    let candidates = state
        .db
        .catches_within(auth.user_id, &BoundingBox::around(center, radius), NEARBY_LIMIT)
        .await?;
    let nearby = candidates
        .into_iter()
        .filter_map(|catch| {
            let distance_km = catch.distance_to(center)?;
            (distance_km <= radius).then_some(NearbyCatch { catch, distance_km })
        })
        .collect();
    Ok(Json(nearby))
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Loads a catch, answering 404 when it is missing and 403 when it belongs
/// to someone else.
async fn owned_catch(state: &AppState, auth: &AuthUser, catch_id: Uuid) -> AppResult<Catch> {
    let catch = state.db.get_catch(catch_id).await?;
    if catch.user_id != auth.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(catch)
}

/// Newly attached photos must be the user's own uploads. References already
/// on the catch are kept as they are.
fn check_photo_owner(
    state: &AppState,
    auth: &AuthUser,
    details: &CatchDetails,
    existing: Option<&CatchDetails>,
) -> AppResult<()> {
    let mut errors = ValidationErrors::new();
    for (index, photo) in details.photos.iter().enumerate() {
        let kept = existing.is_some_and(|e| e.photos.contains(photo));
        if !kept && !state.photos.is_owned_by(photo, auth.user_id) {
            errors.add(format!("photos.{index}"), "The selected photo is invalid.");
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

/// Only the user's own uploads are removed. Storage failures are logged; the
/// catch itself is already consistent.
async fn delete_photos<'a>(
    state: &AppState,
    auth: &AuthUser,
    photos: impl IntoIterator<Item = &'a String>,
) {
    for photo in photos {
        if !state.photos.is_owned_by(photo, auth.user_id) {
            warn!("Not deleting photo {} not uploaded by user {}", photo, auth.user_id);
            continue;
        }
        if let Err(e) = state.photos.delete(photo).await {
            warn!("Failed to delete photo {}: {}", photo, e);
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CatchRequest {
    /// Applies the payload on top of `existing` (or nothing, for a new catch)
    /// and validates the result.
    pub fn into_details(
        self,
        existing: Option<&CatchDetails>,
    ) -> Result<CatchDetails, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let species = match (self.species, existing) {
            (Some(species), _) => species.trim().to_string(),
            (None, Some(old)) => old.species.clone(),
            (None, None) => String::new(),
        };
        let location = match (self.location, existing) {
            (Some(location), _) => location.trim().to_string(),
            (None, Some(old)) => old.location.clone(),
            (None, None) => String::new(),
        };
        let caught_at = match (self.caught_at, existing) {
            (Some(raw), _) => extract::timestamp_field(&mut errors, "caught_at", Some(&raw)),
            (None, Some(old)) => Some(old.caught_at),
            (None, None) => extract::timestamp_field(&mut errors, "caught_at", None),
        };

        fn keep<T: Clone>(update: Option<Option<T>>, old: Option<&Option<T>>) -> Option<T> {
            match update {
                Some(value) => value,
                None => old.cloned().flatten(),
            }
        }

        let details = CatchDetails {
            species,
            weight: keep(self.weight, existing.map(|d| &d.weight)),
            length: keep(self.length, existing.map(|d| &d.length)),
            location,
            latitude: keep(self.latitude, existing.map(|d| &d.latitude)),
            longitude: keep(self.longitude, existing.map(|d| &d.longitude)),
            water_body: keep(self.water_body, existing.map(|d| &d.water_body)),
            caught_at: caught_at.unwrap_or_default(),
            bait_lure: keep(self.bait_lure, existing.map(|d| &d.bait_lure)),
            technique: keep(self.technique, existing.map(|d| &d.technique)),
            water_temp: keep(self.water_temp, existing.map(|d| &d.water_temp)),
            air_temp: keep(self.air_temp, existing.map(|d| &d.air_temp)),
            weather_conditions: keep(
                self.weather_conditions,
                existing.map(|d| &d.weather_conditions),
            ),
            photos: match self.photos {
                Some(photos) => photos.unwrap_or_default(),
                None => existing.map(|d| d.photos.clone()).unwrap_or_default(),
            },
            notes: keep(self.notes, existing.map(|d| &d.notes)),
            is_released: self
                .is_released
                .or(existing.map(|d| d.is_released))
                .unwrap_or(false),
            is_personal_best: self
                .is_personal_best
                .or(existing.map(|d| d.is_personal_best))
                .unwrap_or(false),
        };

        errors.merge(validate_details(&details));
        errors.into_result().map(|()| details)
    }
}

/// Field rules for a complete catch.
pub fn validate_details(d: &CatchDetails) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.required("species", &d.species);
    errors.max_len("species", Some(&d.species), 255);
    errors.required("location", &d.location);
    errors.max_len("location", Some(&d.location), 255);
    errors.between("weight", d.weight, 0.0, 999.999);
    errors.between("length", d.length, 0.0, 999.99);
    errors.between("latitude", d.latitude, -90.0, 90.0);
    errors.between("longitude", d.longitude, -180.0, 180.0);
    errors.between("water_temp", d.water_temp, -10.0, 50.0);
    errors.between("air_temp", d.air_temp, -50.0, 60.0);
    for (field, value) in [
        ("water_body", &d.water_body),
        ("bait_lure", &d.bait_lure),
        ("technique", &d.technique),
        ("weather_conditions", &d.weather_conditions),
    ] {
        errors.max_len(field, value.as_deref(), 255);
    }
    errors.max_len("notes", d.notes.as_deref(), 2000);
    errors.max_items("photos", &d.photos, MAX_PHOTOS);
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn request(value: serde_json::Value) -> CatchRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn new_catch_needs_species_location_and_time() {
        let errors = request(json!({})).into_details(None).unwrap_err();
        assert!(errors.contains("species"));
        assert!(errors.contains("location"));
        assert!(errors.contains("caught_at"));
    }

    #[test]
    fn new_catch_is_built_from_the_payload() {
        let details = request(json!({
            "species": " Largemouth Bass ",
            "location": "Lake Fork",
            "caught_at": "2024-06-01 05:30:00",
            "weight": 3.2,
            "is_released": true
        }))
        .into_details(None)
        .unwrap();
        assert_eq!(details.species, "Largemouth Bass");
        assert_eq!(details.weight, Some(3.2));
        assert_eq!(details.caught_at, Utc.with_ymd_and_hms(2024, 6, 1, 5, 30, 0).unwrap());
        assert!(details.is_released);
        assert!(details.photos.is_empty());
    }

    #[test]
    fn update_keeps_omitted_fields_and_clears_nulls() {
        let existing = request(json!({
            "species": "Pike",
            "location": "River Dee",
            "caught_at": "2024-06-01T05:30:00Z",
            "weight": 5.0,
            "notes": "on a spinner",
            "photos": ["catches/a.jpg"]
        }))
        .into_details(None)
        .unwrap();

        let updated = request(json!({ "weight": 5.5, "notes": null }))
            .into_details(Some(&existing))
            .unwrap();
        assert_eq!(updated.species, "Pike");
        assert_eq!(updated.weight, Some(5.5));
        assert_eq!(updated.notes, None);
        assert_eq!(updated.photos, vec!["catches/a.jpg".to_string()]);
        assert_eq!(updated.caught_at, existing.caught_at);
    }

    #[test]
    fn out_of_range_values_are_reported_per_field() {
        let errors = request(json!({
            "species": "Carp",
            "location": "Pond",
            "caught_at": "yesterday",
            "weight": 1000.0,
            "latitude": 91.0,
            "water_temp": 51.0,
            "photos": ["1", "2", "3", "4", "5", "6"]
        }))
        .into_details(None)
        .unwrap_err();
        for field in ["caught_at", "weight", "latitude", "water_temp", "photos"] {
            assert!(errors.contains(field), "expected an error for {field}");
        }
        assert!(!errors.contains("species"));
    }
}
