//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Requested entity or user does not exist
    #[error("{0}")]
    NotFound(String),

    /// Duplicate idempotent action (e.g. liking the same post twice)
    #[error("{0}")]
    AlreadyDone(String),

    /// Missing or malformed required field
    #[error("{0}")]
    InvalidInput(String),

    /// Duplicate unique key on create (username, email, spot number)
    #[error("{0}")]
    Conflict(String),

    /// Credential check failed
    #[error("Invalid username or password")]
    Unauthorized,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::AlreadyDone(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            ),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        let cases = [
            (
                ApiError::NotFound("Post not found".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::AlreadyDone("User has already liked this post".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::InvalidInput("Username is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Conflict("Username already exists".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                ApiError::InternalServerError,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
