//! services/api/src/web/auth.rs
//!
//! Authentication and account endpoints: registration, login, logout, the
//! account overview and profile, preference and password changes.

use anglerhub_core::domain::{Catch, NewUser, ProfileUpdate, User};
use anglerhub_core::ports::PortError;
use anglerhub_core::stats::{self, GoalView, UserSummary};
use anglerhub_core::units::{PreferencesUpdate, UserPreferences};
use anglerhub_core::validation::ValidationErrors;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::web::extract::JsonBody;
use crate::web::middleware::SESSION_COOKIE;
use crate::web::rest::MessageResponse;
use crate::web::state::{AppState, AuthUser};

pub const MIN_PASSWORD_LEN: usize = 8;
const RECENT_CATCHES: usize = 5;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    /// A reference returned by the photo upload endpoint.
    pub avatar: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteAccountRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub user: User,
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub user: User,
}

#[derive(Serialize, ToSchema)]
pub struct PreferencesResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub preferences: UserPreferences,
}

#[derive(Serialize, ToSchema)]
pub struct AccountOverview {
    #[schema(value_type = Object)]
    pub user: User,
    #[schema(value_type = Vec<Object>)]
    pub recent_catches: Vec<Catch>,
    #[schema(value_type = Vec<Object>)]
    pub active_goals: Vec<GoalView>,
    #[schema(value_type = Object)]
    pub stats: UserSummary,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 422, description = "Invalid request or e-mail already taken")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    // 1. Validate
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();
    let mut errors = ValidationErrors::new();
    errors.required("name", &name);
    errors.max_len("name", Some(&name), 255);
    validate_email(&mut errors, &email);
    validate_new_password(&mut errors, &req.password, &req.password_confirmation);
    errors.into_result()?;

    // 2. Hash the password
    let hashed_password = hash_password(&req.password)?;

    // 3. Create user in database
    let user = state
        .db
        .create_user(NewUser {
            name,
            email,
            hashed_password,
            preferences: UserPreferences::default(),
        })
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => {
                ValidationErrors::single("email", "The email has already been taken.").into()
            }
            other => AppError::from(other),
        })?;
    info!("Registered user {}", user.id);

    // 4. Issue a token and answer with it
    let token = issue_token(&state, user.id).await?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&state, &token))],
        Json(AuthResponse {
            message: "Registration successful".to_string(),
            user,
            token,
        }),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 422, description = "Invalid credentials or deactivated account")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let email = req.email.trim();
    let mut errors = ValidationErrors::new();
    errors.required("email", email);
    errors.required("password", &req.password);
    errors.into_result()?;

    let bad_credentials =
        || AppError::from(ValidationErrors::single("email", "The provided credentials are incorrect."));

    // 1. Get user by email
    let credentials = match state.db.get_user_by_email(email).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => return Err(bad_credentials()),
        Err(e) => return Err(e.into()),
    };

    // 2. Verify password
    if !verify_password(&credentials.hashed_password, &req.password)? {
        return Err(bad_credentials());
    }
    if !credentials.is_active {
        return Err(
            ValidationErrors::single("email", "Your account has been deactivated.").into(),
        );
    }

    // 3. Revoke existing tokens, then issue a fresh one
    state
        .db
        .delete_auth_sessions_for_user(credentials.user_id)
        .await?;
    let token = issue_token(&state, credentials.user_id).await?;
    let user = state.db.get_user(credentials.user_id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&state, &token))],
        Json(AuthResponse {
            message: "Login successful".to_string(),
            user,
            token,
        }),
    ))
}

/// POST /auth/logout - Revoke the token used for this request
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    state.db.delete_auth_session(&auth.token).await?;
    Ok((
        [(header::SET_COOKIE, cleared_cookie())],
        Json(MessageResponse::new("Logged out successfully")),
    ))
}

/// POST /auth/logout-all - Revoke every token of the user
#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    responses(
        (status = 200, description = "All sessions revoked", body = MessageResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_all_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<impl IntoResponse> {
    state.db.delete_auth_sessions_for_user(auth.user_id).await?;
    Ok((
        [(header::SET_COOKIE, cleared_cookie())],
        Json(MessageResponse::new("Logged out from all devices successfully")),
    ))
}

/// GET /auth/user - The account with recent catches, active goals and totals
#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "Account overview", body = AccountOverview),
        (status = 401, description = "No active session")
    )
)]
pub async fn user_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<AccountOverview>> {
    let user = state.db.get_user(auth.user_id).await?;
    let catches = state.db.catches_for_user(auth.user_id).await?;
    let goals = state.db.goals_for_user(auth.user_id).await?;
    let today = state.today();

    let mut recent_catches = catches.clone();
    recent_catches.sort_by(|a, b| b.details.caught_at.cmp(&a.details.caught_at));
    recent_catches.truncate(RECENT_CATCHES);

    let active_goals = stats::active_goals(&goals, today)
        .map(|g| GoalView::new(g.clone(), today))
        .collect();

    Ok(Json(AccountOverview {
        stats: UserSummary::compute(&catches, &goals, today),
        user,
        recent_catches,
        active_goals,
    }))
}

/// PUT /auth/profile - Update name, bio, location or avatar
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 422, description = "Invalid request")
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<ProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let mut errors = ValidationErrors::new();
    if let Some(name) = &req.name {
        errors.required("name", name);
    }
    errors.max_len("name", req.name.as_deref(), 255);
    errors.max_len("bio", req.bio.as_deref(), 1000);
    errors.max_len("location", req.location.as_deref(), 255);
    errors.max_len("avatar", req.avatar.as_deref(), 255);
    errors.into_result()?;

    let update = ProfileUpdate {
        name: req.name.map(|n| n.trim().to_string()),
        bio: req.bio,
        location: req.location,
        avatar: req.avatar,
    };
    let user = state.db.update_profile(auth.user_id, &update).await?;

    Ok(Json(UserResponse {
        message: "Profile updated successfully".to_string(),
        user,
    }))
}

/// PUT /auth/preferences - Merge the supplied preference keys
#[utoipa::path(
    put,
    path = "/api/auth/preferences",
    request_body(content = Object, description = "Any subset of the preference keys."),
    responses(
        (status = 200, description = "Preferences updated", body = PreferencesResponse),
        (status = 422, description = "Unknown unit or format")
    )
)]
pub async fn update_preferences_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(update): JsonBody<PreferencesUpdate>,
) -> AppResult<Json<PreferencesResponse>> {
    let mut preferences = state.db.get_user(auth.user_id).await?.preferences;
    preferences.merge(&update);
    state
        .db
        .update_preferences(auth.user_id, &preferences)
        .await?;

    Ok(Json(PreferencesResponse {
        message: "Preferences updated successfully".to_string(),
        preferences,
    }))
}

/// PUT /auth/password - Change the password and revoke every token
#[utoipa::path(
    put,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 422, description = "Wrong current password or invalid new password")
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let mut errors = ValidationErrors::new();
    errors.required("current_password", &req.current_password);
    validate_new_password(&mut errors, &req.password, &req.password_confirmation);
    errors.into_result()?;

    let credentials = state.db.get_credentials(auth.user_id).await?;
    if !verify_password(&credentials.hashed_password, &req.current_password)? {
        return Err(ValidationErrors::single(
            "current_password",
            "The provided password is incorrect.",
        )
        .into());
    }

    let hashed_password = hash_password(&req.password)?;
    state
        .db
        .update_password(auth.user_id, &hashed_password)
        .await?;
    state.db.delete_auth_sessions_for_user(auth.user_id).await?;
    info!("User {} changed their password", auth.user_id);

    Ok(Json(MessageResponse::new(
        "Password changed successfully. Please log in again.",
    )))
}

/// DELETE /auth/account - Deactivate the account after a password check
#[utoipa::path(
    delete,
    path = "/api/auth/account",
    request_body = DeleteAccountRequest,
    responses(
        (status = 200, description = "Account deactivated", body = MessageResponse),
        (status = 422, description = "Wrong password")
    )
)]
pub async fn delete_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<DeleteAccountRequest>,
) -> AppResult<impl IntoResponse> {
    let mut errors = ValidationErrors::new();
    errors.required("password", &req.password);
    errors.into_result()?;

    let credentials = state.db.get_credentials(auth.user_id).await?;
    if !verify_password(&credentials.hashed_password, &req.password)? {
        return Err(
            ValidationErrors::single("password", "The provided password is incorrect.").into(),
        );
    }

    // The e-mail is freed for a new registration.
    let retired_email = format!(
        "{}_deleted_{}",
        credentials.email,
        state.clock.utc().timestamp()
    );
    state
        .db
        .deactivate_user(auth.user_id, &retired_email)
        .await?;
    state.db.delete_auth_sessions_for_user(auth.user_id).await?;
    info!("Deactivated user {}", auth.user_id);

    Ok((
        [(header::SET_COOKIE, cleared_cookie())],
        Json(MessageResponse::new("Account deactivated successfully.")),
    ))
}

//=========================================================================================
// Helpers
//=========================================================================================

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            AppError::Internal("Failed to hash password".to_string())
        })
}

fn verify_password(hashed_password: &str, candidate: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        AppError::Internal("Stored password hash is unreadable".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generates a token and stores it with the configured lifetime.
async fn issue_token(state: &AppState, user_id: Uuid) -> AppResult<String> {
    let token = Uuid::new_v4().to_string();
    let expires_at = state.clock.utc() + Duration::days(state.config.token_ttl_days);
    state
        .db
        .create_auth_session(&token, user_id, expires_at)
        .await?;
    Ok(token)
}

fn session_cookie(state: &AppState, token: &str) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        token,
        Duration::days(state.config.token_ttl_days).num_seconds()
    )
}

fn cleared_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0")
}

fn validate_email(errors: &mut ValidationErrors, email: &str) {
    if email.is_empty() {
        errors.required("email", email);
        return;
    }
    errors.max_len("email", Some(email), 255);
    if !looks_like_email(email) {
        errors.add("email", "The email field must be a valid email address.");
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && domain
                    .split('.')
                    .all(|label| !label.is_empty())
                && domain.contains('.')
        }
        None => false,
    }
}

fn validate_new_password(errors: &mut ValidationErrors, password: &str, confirmation: &str) {
    if password.is_empty() {
        errors.required("password", password);
        return;
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("The password field must be at least {MIN_PASSWORD_LEN} characters."),
        );
    }
    if password != confirmation {
        errors.add("password", "The password field confirmation does not match.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("angler@example.com", true)]
    #[case("first.last@lake.co.uk", true)]
    #[case("no-at-sign.example.com", false)]
    #[case("@example.com", false)]
    #[case("angler@localhost", false)]
    #[case("angler@example..com", false)]
    #[case("ang ler@example.com", false)]
    fn email_shapes(#[case] email: &str, #[case] valid: bool) {
        assert_eq!(looks_like_email(email), valid);
    }

    #[test]
    fn new_password_rules() {
        let mut errors = ValidationErrors::new();
        validate_new_password(&mut errors, "short", "short");
        assert!(errors.contains("password"));

        let mut errors = ValidationErrors::new();
        validate_new_password(&mut errors, "long enough", "long enuogh");
        assert!(errors.contains("password"));

        let mut errors = ValidationErrors::new();
        validate_new_password(&mut errors, "long enough", "long enough");
        assert!(errors.is_empty());
    }

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("tight lines").unwrap();
        assert!(verify_password(&hash, "tight lines").unwrap());
        assert!(!verify_password(&hash, "loose lines").unwrap());
    }
}
