//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the error
//! type handlers return, which renders as a JSON body.

use anglerhub_core::ports::PortError;
use anglerhub_core::validation::ValidationErrors;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

//=========================================================================================
// HTTP error responses
//=========================================================================================

/// Errors a handler can answer with. Each maps to one status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 422 with per-field messages.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// 422 without field detail, e.g. an illegal goal transition.
    #[error("{0}")]
    Unprocessable(String),

    #[error("Unauthenticated.")]
    Unauthenticated,

    /// The resource exists but belongs to someone else.
    #[error("Unauthorized")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    /// Logged, then reported to the client without detail.
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a ValidationErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match &self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                errors
                    .first_message()
                    .unwrap_or("The given data was invalid.")
                    .to_string(),
                Some(errors),
            ),
            AppError::Unprocessable(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, message.clone(), None)
            }
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string(), None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string(), None),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone(), None),
            AppError::Internal(detail) => {
                error!("Internal error while handling request: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server Error".to_string(),
                    None,
                )
            }
        };
        (status, Json(ErrorBody { message, errors })).into_response()
    }
}

impl From<PortError> for AppError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(what) => AppError::NotFound(what),
            PortError::Unauthorized => AppError::Unauthenticated,
            PortError::Conflict(message) => AppError::Unprocessable(message),
            PortError::Unexpected(detail) => AppError::Internal(detail),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(ValidationErrors::single("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(ValidationErrors::single("query", rejection.body_text()))
    }
}
