//! services/api/src/web/goals.rs
//!
//! Goal endpoints: CRUD, statistics, the explicit state machine transitions
//! and the refresh-all trigger. Status changes run under the owner's
//! evaluation lock so they cannot interleave with a progress refresh.

use anglerhub_core::criteria::GoalCriteria;
use anglerhub_core::domain::{Goal, GoalDraft, GoalStatus, GoalType};
use anglerhub_core::query::{GoalFilter, GoalSortField, Page, PageRequest, SortOrder};
use anglerhub_core::stats::{GoalStatistics, GoalView};
use anglerhub_core::validation::ValidationErrors;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::web::extract::{self, flag, present, JsonBody, QueryParams};
use crate::web::rest::MessageResponse;
use crate::web::state::{AppState, AuthUser};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateGoalRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    /// species, weight, count, location or custom.
    #[serde(rename = "type")]
    pub goal_type: Option<String>,
    #[schema(value_type = Object)]
    pub criteria: Option<Value>,
    pub target_value: Option<i64>,
    pub start_date: Option<String>,
    pub target_date: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Omitted keys keep their stored value. The goal type cannot change.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateGoalRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[schema(value_type = Option<Object>)]
    pub criteria: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub target_value: Option<Option<i64>>,
    pub target_date: Option<String>,
    pub status: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct GoalListQuery {
    pub status: Option<GoalStatus>,
    #[serde(rename = "type")]
    pub goal_type: Option<GoalType>,
    #[serde(default, deserialize_with = "flag")]
    pub active_only: bool,
    #[serde(default, deserialize_with = "flag")]
    pub completed_only: bool,
    #[serde(default, deserialize_with = "flag")]
    pub overdue_only: bool,
    pub sort_by: Option<GoalSortField>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct GoalResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub goal: GoalView,
}

#[derive(Serialize, ToSchema)]
pub struct RefreshResponse {
    pub message: String,
    pub updated_count: usize,
}

/// An explicit state machine transition requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalAction {
    Complete,
    Pause,
    Resume,
    Cancel,
}

impl GoalAction {
    fn target(&self) -> GoalStatus {
        match self {
            Self::Complete => GoalStatus::Completed,
            Self::Pause => GoalStatus::Paused,
            Self::Resume => GoalStatus::Active,
            Self::Cancel => GoalStatus::Cancelled,
        }
    }

    /// Why `current` cannot take this action.
    fn refusal(&self, current: GoalStatus) -> &'static str {
        match (self, current) {
            (Self::Complete, GoalStatus::Completed) => "Goal is already completed",
            (Self::Complete, _) => "Only active goals can be completed",
            (Self::Pause, _) => "Only active goals can be paused",
            (Self::Resume, _) => "Only paused goals can be resumed",
            (Self::Cancel, _) => "Only active or paused goals can be cancelled",
        }
    }

    fn done_message(&self) -> &'static str {
        match self {
            Self::Complete => "Goal marked as completed",
            Self::Pause => "Goal paused",
            Self::Resume => "Goal resumed",
            Self::Cancel => "Goal cancelled",
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /goals - The user's goals with derived progress, filtered and paginated
#[utoipa::path(
    get,
    path = "/api/goals",
    params(
        ("status" = Option<String>, Query, description = "active, completed, paused or cancelled."),
        ("type" = Option<String>, Query, description = "species, weight, count, location or custom."),
        ("active_only" = Option<bool>, Query, description = "Only active goals."),
        ("completed_only" = Option<bool>, Query, description = "Only completed goals."),
        ("overdue_only" = Option<bool>, Query, description = "Only active goals past their target date."),
        ("sort_by" = Option<String>, Query, description = "created_at, target_date, start_date, title, status or current_value."),
        ("sort_order" = Option<String>, Query, description = "asc or desc."),
        ("page" = Option<u32>, Query, description = "1-based page."),
        ("per_page" = Option<u32>, Query, description = "Page size, at most 100.")
    ),
    responses((status = 200, description = "A page of goals"))
)]
pub async fn list_goals_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    QueryParams(query): QueryParams<GoalListQuery>,
) -> AppResult<Json<Page<GoalView>>> {
    let today = state.today();
    let filter = GoalFilter {
        status: query.status,
        goal_type: query.goal_type,
        active_only: query.active_only,
        completed_only: query.completed_only,
        overdue_only: query.overdue_only,
        sort_by: query.sort_by.unwrap_or_default(),
        sort_order: query.sort_order.unwrap_or_default(),
        ..GoalFilter::new(today)
    };
    let page = PageRequest::new(query.page, query.per_page);
    let goals = state.db.list_goals(auth.user_id, &filter, page).await?;
    Ok(Json(goals.map(|g| GoalView::new(g, today))))
}

/// POST /goals - Create a goal and evaluate it immediately
#[utoipa::path(
    post,
    path = "/api/goals",
    request_body = CreateGoalRequest,
    responses(
        (status = 201, description = "Goal created", body = GoalResponse),
        (status = 422, description = "Invalid goal or criteria")
    )
)]
pub async fn create_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateGoalRequest>,
) -> AppResult<impl IntoResponse> {
    let draft = req.into_draft()?;
    let goal = state.db.create_goal(auth.user_id, &draft).await?;
    info!("User {} created {} goal {}", auth.user_id, goal.criteria.goal_type(), goal.id);

    let goal = refreshed(&state, goal).await;
    Ok((
        StatusCode::CREATED,
        Json(GoalResponse {
            message: "Goal created successfully".to_string(),
            goal: GoalView::new(goal, state.today()),
        }),
    ))
}

/// GET /goals/{id} - One goal with derived progress
#[utoipa::path(
    get,
    path = "/api/goals/{id}",
    params(("id" = Uuid, Path, description = "Goal id.")),
    responses(
        (status = 200, description = "The goal"),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such goal")
    )
)]
pub async fn show_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> AppResult<Json<GoalView>> {
    let goal = owned_goal(&state, &auth, goal_id).await?;
    Ok(Json(GoalView::new(goal, state.today())))
}

/// PUT /goals/{id} - Edit a goal that is still open
#[utoipa::path(
    put,
    path = "/api/goals/{id}",
    params(("id" = Uuid, Path, description = "Goal id.")),
    request_body = UpdateGoalRequest,
    responses(
        (status = 200, description = "Goal updated", body = GoalResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such goal"),
        (status = 422, description = "Invalid change, or the goal is completed or cancelled")
    )
)]
pub async fn update_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateGoalRequest>,
) -> AppResult<Json<GoalResponse>> {
    let goal = state
        .tracker
        .with_user_lock(auth.user_id, || apply_update(&state, &auth, goal_id, req))
        .await?;

    let goal = refreshed(&state, goal).await;
    Ok(Json(GoalResponse {
        message: "Goal updated successfully".to_string(),
        goal: GoalView::new(goal, state.today()),
    }))
}

/// DELETE /goals/{id} - Delete a goal
#[utoipa::path(
    delete,
    path = "/api/goals/{id}",
    params(("id" = Uuid, Path, description = "Goal id.")),
    responses(
        (status = 200, description = "Goal deleted", body = MessageResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "No such goal")
    )
)]
pub async fn delete_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    owned_goal(&state, &auth, goal_id).await?;
    state.db.delete_goal(goal_id).await?;
    info!("User {} deleted goal {}", auth.user_id, goal_id);
    Ok(Json(MessageResponse::new("Goal deleted successfully")))
}

/// GET /goals/statistics - Aggregates over the user's goals
#[utoipa::path(
    get,
    path = "/api/goals/statistics",
    responses((status = 200, description = "Goal statistics"))
)]
pub async fn goal_statistics_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<GoalStatistics>> {
    let goals = state.db.goals_for_user(auth.user_id).await?;
    Ok(Json(GoalStatistics::compute(&goals, state.today())))
}

/// POST /goals/refresh-progress - Re-evaluate every goal of the user
#[utoipa::path(
    post,
    path = "/api/goals/refresh-progress",
    responses((status = 200, description = "Progress refreshed", body = RefreshResponse))
)]
pub async fn refresh_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<RefreshResponse>> {
    let summary = state.tracker.refresh_user_goals(auth.user_id).await?;
    Ok(Json(RefreshResponse {
        message: "Progress updated for all active goals".to_string(),
        updated_count: summary.active,
    }))
}

/// POST /goals/{id}/complete
#[utoipa::path(
    post,
    path = "/api/goals/{id}/complete",
    params(("id" = Uuid, Path, description = "Goal id.")),
    responses(
        (status = 200, description = "Goal completed", body = GoalResponse),
        (status = 422, description = "Goal is not active")
    )
)]
pub async fn complete_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> AppResult<Json<GoalResponse>> {
    transition(&state, &auth, goal_id, GoalAction::Complete).await
}

/// POST /goals/{id}/pause
#[utoipa::path(
    post,
    path = "/api/goals/{id}/pause",
    params(("id" = Uuid, Path, description = "Goal id.")),
    responses(
        (status = 200, description = "Goal paused", body = GoalResponse),
        (status = 422, description = "Goal is not active")
    )
)]
pub async fn pause_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> AppResult<Json<GoalResponse>> {
    transition(&state, &auth, goal_id, GoalAction::Pause).await
}

/// POST /goals/{id}/resume - Reactivate a paused goal and evaluate it
#[utoipa::path(
    post,
    path = "/api/goals/{id}/resume",
    params(("id" = Uuid, Path, description = "Goal id.")),
    responses(
        (status = 200, description = "Goal resumed", body = GoalResponse),
        (status = 422, description = "Goal is not paused")
    )
)]
pub async fn resume_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> AppResult<Json<GoalResponse>> {
    transition(&state, &auth, goal_id, GoalAction::Resume).await
}

/// POST /goals/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/goals/{id}/cancel",
    params(("id" = Uuid, Path, description = "Goal id.")),
    responses(
        (status = 200, description = "Goal cancelled", body = GoalResponse),
        (status = 422, description = "Goal is already closed")
    )
)]
pub async fn cancel_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(goal_id): Path<Uuid>,
) -> AppResult<Json<GoalResponse>> {
    transition(&state, &auth, goal_id, GoalAction::Cancel).await
}

//=========================================================================================
// Helpers
//=========================================================================================

async fn owned_goal(state: &AppState, auth: &AuthUser, goal_id: Uuid) -> AppResult<Goal> {
    let goal = state.db.get_goal(goal_id).await?;
    if goal.user_id != auth.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(goal)
}

/// The stored goal re-evaluated against the user's catches. A failed
/// evaluation is logged and the goal returned as stored.
async fn refreshed(state: &AppState, goal: Goal) -> Goal {
    match state.tracker.refresh_goal(goal.id).await {
        Ok(goal) => goal,
        Err(e) => {
            warn!("Failed to evaluate goal {}: {}", goal.id, e);
            goal
        }
    }
}

/// Runs with the owner's lock held; must not call back into the tracker.
async fn apply_update(
    state: &AppState,
    auth: &AuthUser,
    goal_id: Uuid,
    req: UpdateGoalRequest,
) -> AppResult<Goal> {
    let mut goal = owned_goal(state, auth, goal_id).await?;
    match goal.status {
        GoalStatus::Completed => {
            return Err(AppError::Unprocessable("Cannot update completed goals".to_string()))
        }
        GoalStatus::Cancelled => {
            return Err(AppError::Unprocessable("Cannot update cancelled goals".to_string()))
        }
        GoalStatus::Active | GoalStatus::Paused => {}
    }

    let now = state.clock.utc();
    req.apply_to(&mut goal, now)?;
    goal.updated_at = now;
    let goal = state.db.update_goal(&goal).await?;
    info!("User {} updated goal {}", auth.user_id, goal.id);
    Ok(goal)
}

async fn transition(
    state: &AppState,
    auth: &AuthUser,
    goal_id: Uuid,
    action: GoalAction,
) -> AppResult<Json<GoalResponse>> {
    let goal = state
        .tracker
        .with_user_lock(auth.user_id, || async {
            let mut goal = owned_goal(state, auth, goal_id).await?;
            if !goal.status.can_transition_to(action.target()) {
                return Err(AppError::Unprocessable(
                    action.refusal(goal.status).to_string(),
                ));
            }
            let now = state.clock.utc();
            goal.status = action.target();
            if action == GoalAction::Complete {
                goal.completed_at = Some(now);
            }
            goal.updated_at = now;
            let goal = state.db.update_goal(&goal).await?;
            info!("Goal {} is now {}", goal.id, goal.status);
            Ok::<Goal, AppError>(goal)
        })
        .await?;

    // A resumed goal catches up on whatever was logged while it was paused.
    let goal = if action == GoalAction::Resume {
        refreshed(state, goal).await
    } else {
        goal
    };
    Ok(Json(GoalResponse {
        message: action.done_message().to_string(),
        goal: GoalView::new(goal, state.today()),
    }))
}

fn target_value(errors: &mut ValidationErrors, raw: Option<i64>) -> Option<i32> {
    let raw = raw?;
    match i32::try_from(raw) {
        Ok(value) if value >= 1 => Some(value),
        _ => {
            errors.add("target_value", "The target_value field must be at least 1.");
            None
        }
    }
}

fn check_dates(errors: &mut ValidationErrors, start: NaiveDate, target: NaiveDate) {
    if target <= start {
        errors.add(
            "target_date",
            "The target_date field must be a date after start_date.",
        );
    }
}

impl CreateGoalRequest {
    pub fn into_draft(self) -> Result<GoalDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = self.title.trim().to_string();
        errors.required("title", &title);
        errors.max_len("title", Some(&title), 255);
        errors.max_len("description", self.description.as_deref(), 1000);

        let goal_type = match self.goal_type.as_deref() {
            None => {
                errors.add("type", "The type field is required.");
                None
            }
            Some(raw) => match raw.parse::<GoalType>() {
                Ok(goal_type) => Some(goal_type),
                Err(_) => {
                    errors.add("type", "The selected type is invalid.");
                    None
                }
            },
        };
        let criteria = match (goal_type, &self.criteria) {
            (_, None) => {
                errors.add("criteria", "The criteria field is required.");
                None
            }
            (Some(goal_type), Some(raw)) => match GoalCriteria::parse(goal_type, raw) {
                Ok(criteria) => Some(criteria),
                Err(e) => {
                    errors.merge(e);
                    None
                }
            },
            (None, Some(_)) => None,
        };

        let target_value = target_value(&mut errors, self.target_value);
        let start_date = extract::date_field(&mut errors, "start_date", self.start_date.as_deref());
        let target_date =
            extract::date_field(&mut errors, "target_date", self.target_date.as_deref());
        if let (Some(start), Some(target)) = (start_date, target_date) {
            check_dates(&mut errors, start, target);
        }

        match (criteria, start_date, target_date) {
            (Some(criteria), Some(start_date), Some(target_date)) if errors.is_empty() => {
                Ok(GoalDraft {
                    title,
                    description: self.description,
                    criteria,
                    target_value,
                    start_date,
                    target_date,
                    is_public: self.is_public,
                })
            }
            _ => Err(errors),
        }
    }
}

impl UpdateGoalRequest {
    /// Validates the payload and writes it onto `goal`. Nothing is changed
    /// when any field fails.
    pub fn apply_to(
        self,
        goal: &mut Goal,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), AppError> {
        let mut errors = ValidationErrors::new();

        let title = self.title.map(|t| t.trim().to_string());
        if let Some(title) = &title {
            errors.required("title", title);
        }
        errors.max_len("title", title.as_deref(), 255);
        if let Some(Some(description)) = &self.description {
            errors.max_len("description", Some(description), 1000);
        }

        let criteria = match &self.criteria {
            Some(raw) => match GoalCriteria::parse(goal.criteria.goal_type(), raw) {
                Ok(criteria) => Some(criteria),
                Err(e) => {
                    errors.merge(e);
                    None
                }
            },
            None => None,
        };

        let target_value = self
            .target_value
            .map(|raw| target_value(&mut errors, raw));

        let target_date = match self.target_date.as_deref() {
            Some(raw) => {
                let parsed = extract::date_field(&mut errors, "target_date", Some(raw));
                if let Some(target) = parsed {
                    check_dates(&mut errors, goal.start_date, target);
                }
                parsed
            }
            None => None,
        };

        let status = match self.status.as_deref() {
            Some(raw) => match raw.parse::<GoalStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    errors.add("status", "The selected status is invalid.");
                    None
                }
            },
            None => None,
        };

        errors.into_result()?;

        if let Some(status) = status.filter(|s| *s != goal.status) {
            if !goal.status.can_transition_to(status) {
                return Err(AppError::Unprocessable(format!(
                    "A {} goal cannot become {}",
                    goal.status, status
                )));
            }
            goal.status = status;
            if status == GoalStatus::Completed {
                goal.completed_at = Some(now);
            }
        }
        if let Some(title) = title {
            goal.title = title;
        }
        if let Some(description) = self.description {
            goal.description = description;
        }
        if let Some(criteria) = criteria {
            goal.criteria = criteria;
        }
        if let Some(target_value) = target_value {
            goal.target_value = target_value;
        }
        if let Some(target_date) = target_date {
            goal.target_date = target_date;
        }
        if let Some(is_public) = self.is_public {
            goal.is_public = is_public;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anglerhub_core::criteria::SpeciesCriteria;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use serde_json::json;

    fn create(value: Value) -> Result<GoalDraft, ValidationErrors> {
        serde_json::from_value::<CreateGoalRequest>(value)
            .unwrap()
            .into_draft()
    }

    fn stored_goal(status: GoalStatus) -> Goal {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        Goal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Bass season".into(),
            description: Some("three bass".into()),
            criteria: GoalCriteria::Species(SpeciesCriteria {
                species: "bass".into(),
                min_weight: None,
            }),
            target_value: Some(3),
            current_value: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            target_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            status,
            completed_at: None,
            is_public: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn valid_species_goal_becomes_a_draft() {
        let draft = create(json!({
            "title": "Bass season",
            "type": "species",
            "criteria": { "species": "bass", "min_weight": 2.0 },
            "target_value": 3,
            "start_date": "2024-06-01",
            "target_date": "2024-09-01"
        }))
        .unwrap();
        assert_eq!(draft.criteria.goal_type(), GoalType::Species);
        assert_eq!(draft.target_value, Some(3));
    }

    #[rstest]
    #[case(json!({ "type": "fishing" }), "type")]
    #[case(json!({ "type": "species", "criteria": {} }), "criteria.species")]
    #[case(json!({ "type": "weight", "criteria": {} }), "criteria.target_weight")]
    #[case(json!({ "type": "location", "criteria": { "location": null } }), "criteria.location")]
    #[case(json!({ "type": "count", "criteria": {}, "target_value": 0 }), "target_value")]
    #[case(json!({ "type": "count", "criteria": {}, "target_date": "2024-05-01" }), "target_date")]
    #[case(json!({ "type": "count", "criteria": {}, "title": "" }), "title")]
    fn invalid_goals_are_rejected_per_field(#[case] overrides: Value, #[case] field: &str) {
        let mut body = json!({
            "title": "Goal",
            "type": "count",
            "criteria": {},
            "start_date": "2024-06-01",
            "target_date": "2024-09-01"
        });
        for (key, value) in overrides.as_object().unwrap() {
            body[key] = value.clone();
        }
        let errors = create(body).unwrap_err();
        assert!(errors.contains(field), "expected {field} in {errors:?}");
    }

    #[test]
    fn update_changes_only_supplied_fields() {
        let mut goal = stored_goal(GoalStatus::Active);
        let req: UpdateGoalRequest =
            serde_json::from_value(json!({ "title": "Bigger bass", "description": null })).unwrap();
        req.apply_to(&mut goal, Utc::now()).unwrap();
        assert_eq!(goal.title, "Bigger bass");
        assert_eq!(goal.description, None);
        assert_eq!(goal.target_value, Some(3));
    }

    #[test]
    fn update_rejects_illegal_status_change() {
        let mut goal = stored_goal(GoalStatus::Paused);
        let req: UpdateGoalRequest =
            serde_json::from_value(json!({ "status": "completed" })).unwrap();
        assert!(matches!(
            req.apply_to(&mut goal, Utc::now()),
            Err(AppError::Unprocessable(_))
        ));
        assert_eq!(goal.status, GoalStatus::Paused);
    }

    #[test]
    fn update_validates_criteria_against_the_stored_type() {
        let mut goal = stored_goal(GoalStatus::Active);
        let req: UpdateGoalRequest =
            serde_json::from_value(json!({ "criteria": { "location": "Lake Fork" } })).unwrap();
        match req.apply_to(&mut goal, Utc::now()) {
            Err(AppError::Validation(errors)) => assert!(errors.contains("criteria.species")),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[rstest]
    #[case(GoalAction::Complete, GoalStatus::Completed, "Goal is already completed")]
    #[case(GoalAction::Pause, GoalStatus::Paused, "Only active goals can be paused")]
    #[case(GoalAction::Resume, GoalStatus::Active, "Only paused goals can be resumed")]
    fn refusals_name_the_rule(
        #[case] action: GoalAction,
        #[case] current: GoalStatus,
        #[case] message: &str,
    ) {
        assert!(!current.can_transition_to(action.target()));
        assert_eq!(action.refusal(current), message);
    }
}
