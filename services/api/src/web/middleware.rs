//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;
use crate::web::state::{AppState, AuthUser};

pub const SESSION_COOKIE: &str = "session";

/// Middleware that validates the bearer token (or the session cookie) and
/// extracts the owning user.
///
/// If valid, inserts an `AuthUser` into request extensions for handlers to use.
/// If invalid or missing, answers 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Extract the token from the Authorization header or the cookie
    let token = token_from_headers(req.headers()).ok_or(AppError::Unauthenticated)?;

    // 2. Validate it in the database, get user_id
    let user_id = state
        .db
        .validate_auth_session(&token)
        .await
        .map_err(|e| {
            debug!("Rejected auth token: {}", e);
            AppError::Unauthenticated
        })?;

    // 3. Insert the identity into request extensions
    req.extensions_mut().insert(AuthUser { user_id, token });

    // 4. Continue to the handler
    Ok(next.run(req).await)
}

/// `Authorization: Bearer <token>` wins over the `session` cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            c.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
