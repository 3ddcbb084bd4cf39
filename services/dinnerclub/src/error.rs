//! Custom error types for the dinnerclub service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::validation::FieldError;

/// Error type returned by every handler
#[derive(Error, Debug)]
pub enum AppError {
    /// Guard violation or failed authentication; no detail is given
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated, but not allowed to touch the resource
    #[error("Forbidden")]
    Forbidden,

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Field-level validation failures
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl AppError {
    fn internal(err: &dyn std::fmt::Display) -> Response {
        error!("Request failed: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
            .into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized => return StatusCode::UNAUTHORIZED.into_response(),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Record not found!".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Validation(errors) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors })))
                    .into_response();
            }
            AppError::Auth(err) => match err {
                AuthError::DuplicateUsername | AuthError::DuplicateEmail => {
                    (StatusCode::CONFLICT, "User already signed up.".to_string())
                }
                AuthError::ReferralMismatch => (
                    StatusCode::FORBIDDEN,
                    "The referral code you entered is incorrect.".to_string(),
                ),
                AuthError::InvalidCredentials | AuthError::InvalidToken => (
                    StatusCode::UNAUTHORIZED,
                    "The username or password you entered is incorrect.".to_string(),
                ),
                AuthError::Validation(errors) => {
                    return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors })))
                        .into_response();
                }
                other => return Self::internal(&other),
            },
            AppError::Database(err) => return Self::internal(&err),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for handler results
pub type AppResult<T> = Result<T, AppError>;
