pub mod auth;
pub mod catches;
pub mod extract;
pub mod goals;
pub mod health;
pub mod middleware;
pub mod photos;
pub mod rest;
pub mod state;
pub mod weather;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
pub use middleware::require_auth;
pub use state::{AppState, AuthUser};

/// Sent by offline clients on replayed mutations. Delivery is at-least-once;
/// the header is accepted but not deduplicated on.
const IDEMPOTENCY_KEY: &str = "idempotency-key";

/// Multipart framing on top of the largest accepted photo.
const BODY_LIMIT: usize = photos::MAX_PHOTO_BYTES + 1024 * 1024;

/// Builds the `/api` router. Everything except registration and login sits
/// behind `require_auth`.
pub fn router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let cors = cors_layer(&state.config.cors_origin)?;

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/logout-all", post(auth::logout_all_handler))
        .route("/auth/user", get(auth::user_handler))
        .route("/auth/profile", put(auth::update_profile_handler))
        .route(
            "/auth/preferences",
            put(auth::update_preferences_handler),
        )
        .route("/auth/password", put(auth::change_password_handler))
        .route(
            "/auth/account",
            delete(auth::delete_account_handler),
        )
        .route(
            "/catches",
            get(catches::list_catches_handler).post(catches::create_catch_handler),
        )
        .route("/catches/statistics", get(catches::catch_statistics_handler))
        .route("/catches/nearby", get(catches::nearby_catches_handler))
        .route(
            "/catches/{id}",
            get(catches::show_catch_handler)
                .put(catches::update_catch_handler)
                .delete(catches::delete_catch_handler),
        )
        .route("/photos", post(photos::upload_photo_handler))
        .route(
            "/goals",
            get(goals::list_goals_handler).post(goals::create_goal_handler),
        )
        .route("/goals/statistics", get(goals::goal_statistics_handler))
        .route("/goals/refresh-progress", post(goals::refresh_progress_handler))
        .route(
            "/goals/{id}",
            get(goals::show_goal_handler)
                .put(goals::update_goal_handler)
                .delete(goals::delete_goal_handler),
        )
        .route("/goals/{id}/complete", post(goals::complete_goal_handler))
        .route("/goals/{id}/pause", post(goals::pause_goal_handler))
        .route("/goals/{id}/resume", post(goals::resume_goal_handler))
        .route("/goals/{id}/cancel", post(goals::cancel_goal_handler))
        .route(
            "/weather-logs",
            get(weather::list_weather_logs_handler).post(weather::create_weather_log_handler),
        )
        .route("/health", get(health::health_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .with_state(state);

    Ok(Router::new().nest("/api", api_router))
}

fn cors_layer(origin: &str) -> Result<CorsLayer, ApiError> {
    let origin = origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", origin, e))
    })?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(IDEMPOTENCY_KEY),
        ]))
}
