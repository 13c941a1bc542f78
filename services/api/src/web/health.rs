//! services/api/src/web/health.rs

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::web::state::{AppState, AuthUser};

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Name of the authenticated user.
    pub user: String,
    pub timestamp: DateTime<Utc>,
}

/// GET /health - Liveness check for an authenticated client
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<HealthResponse>> {
    let user = state.db.get_user(auth.user_id).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        user: user.name,
        timestamp: state.clock.utc(),
    }))
}
