/// Error types for the blog service
///
/// Errors are converted to appropriate HTTP responses for API clients.
/// The status mapping carries the authorization distinction the handlers
/// rely on: an unauthenticated caller gets 401, an authenticated caller
/// without rights gets 403.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;
use validator::ValidationErrors;

/// Result type for blog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Database operation failed
    Database(String),

    /// Malformed input with per-field detail
    Validation(ValidationErrors),

    /// Referenced post/document does not exist, or its payload is missing
    NotFound(String),

    /// Unauthenticated caller requesting a gated resource
    AuthRequired(String),

    /// Authenticated but lacking rights
    Forbidden(String),

    /// Internal server error
    Internal(String),

    /// Bad request (unparseable multipart body, invalid field value)
    BadRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Validation(errors) => write!(f, "Validation failed: {}", errors),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::AuthRequired(msg) => write!(f, "Authentication required: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let body = match self {
            AppError::Validation(errors) => serde_json::json!({
                "error": "Validation failed",
                "fields": errors,
                "status": status.as_u16(),
            }),
            other => serde_json::json!({
                "error": other.to_string(),
                "status": status.as_u16(),
            }),
        };

        HttpResponse::build(status).json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::storage::StorageError> for AppError {
    fn from(err: crate::storage::StorageError) -> Self {
        match err {
            crate::storage::StorageError::Missing(key) => {
                AppError::NotFound(format!("file payload '{}' is missing", key))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
