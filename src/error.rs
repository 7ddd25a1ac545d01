/// Unified error types for Stockroom
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors (missing, invalid or expired credential)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors (valid credential, insufficient privilege)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Payload validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (uniqueness or foreign-key breach)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Token signing/parsing errors
    #[error("Token error: {0}")]
    Jwt(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            ApiError::Authorization(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            ApiError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            ApiError::Jwt(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type ApiResult<T> = Result<T, ApiError>;
