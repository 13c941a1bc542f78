//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification and the response
//! payloads shared across handler modules.

use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{auth, catches, goals, health, photos, weather};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::logout_all_handler,
        auth::user_handler,
        auth::update_profile_handler,
        auth::update_preferences_handler,
        auth::change_password_handler,
        auth::delete_account_handler,
        catches::list_catches_handler,
        catches::create_catch_handler,
        catches::show_catch_handler,
        catches::update_catch_handler,
        catches::delete_catch_handler,
        catches::catch_statistics_handler,
        catches::nearby_catches_handler,
        goals::list_goals_handler,
        goals::create_goal_handler,
        goals::show_goal_handler,
        goals::update_goal_handler,
        goals::delete_goal_handler,
        goals::goal_statistics_handler,
        goals::refresh_progress_handler,
        goals::complete_goal_handler,
        goals::pause_goal_handler,
        goals::resume_goal_handler,
        goals::cancel_goal_handler,
        weather::list_weather_logs_handler,
        weather::create_weather_log_handler,
        photos::upload_photo_handler,
        health::health_handler,
    ),
    components(
        schemas(
            MessageResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::ProfileRequest,
            auth::ChangePasswordRequest,
            auth::DeleteAccountRequest,
            auth::AuthResponse,
            auth::UserResponse,
            auth::PreferencesResponse,
            auth::AccountOverview,
            catches::CatchRequest,
            catches::CatchResponse,
            goals::CreateGoalRequest,
            goals::UpdateGoalRequest,
            goals::GoalResponse,
            goals::RefreshResponse,
            weather::WeatherLogRequest,
            weather::WeatherLogResponse,
            photos::PhotoUploadResponse,
            health::HealthResponse,
        )
    ),
    tags(
        (name = "AnglerHub API", description = "Catch logging, goal tracking and weather logs for anglers.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Response Structs
//=========================================================================================

/// A bare confirmation.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
