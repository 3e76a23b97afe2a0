//! Error types for the Book Inventory server

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Field name to error messages, as returned in 400 responses
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict on {field}: {message}")]
    Conflict { field: String, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl AppError {
    /// Validation error carrying a single message for one field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

fn detail(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorResponse { detail })).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            AppError::NotFound(what) => {
                tracing::debug!("Not found: {}", what);
                StatusCode::NOT_FOUND.into_response()
            }
            AppError::Conflict { field, message } => {
                let mut errors = FieldErrors::new();
                errors.insert(field, vec![message]);
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            AppError::Unauthorized(msg) => detail(StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => detail(StatusCode::BAD_REQUEST, msg),
            AppError::UnsupportedMediaType(msg) => detail(StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Unavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                detail(StatusCode::SERVICE_UNAVAILABLE, msg)
            }
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (AppError::field("title", "This field is required."), StatusCode::BAD_REQUEST),
            (AppError::NotFound("Book 1".into()), StatusCode::NOT_FOUND),
            (
                AppError::Conflict {
                    field: "username".into(),
                    message: "taken".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Unauthorized("nope".into()), StatusCode::UNAUTHORIZED),
            (AppError::UnsupportedMediaType("text/plain".into()), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Unavailable("db down".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
