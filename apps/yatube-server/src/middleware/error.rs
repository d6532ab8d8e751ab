//! Error handling - RFC 7807 problem responses, plus the login redirect.

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use std::fmt;

use yatube_core::DomainError;
use yatube_core::error::RepoError;
use yatube_shared::ErrorResponse;

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    UnsupportedMediaType(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
    /// Caller must sign in first; holds the login URL to redirect to.
    LoginRequired(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::UnsupportedMediaType(msg) => write!(f, "Unsupported media type: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::LoginRequired(location) => write!(f, "Login required: {}", location),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::LoginRequired(_) => StatusCode::FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::BadRequest(detail) => ErrorResponse::new(400, "Bad Request").with_detail(detail),
            AppError::UnsupportedMediaType(detail) => {
                ErrorResponse::new(415, "Unsupported Media Type").with_detail(detail)
            }
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::Conflict(detail) => ErrorResponse::conflict(detail),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
            AppError::LoginRequired(location) => {
                return HttpResponse::Found()
                    .insert_header((header::LOCATION, location.as_str()))
                    .finish();
            }
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { .. } => AppError::NotFound(err.to_string()),
            DomainError::EditConflict { .. } => AppError::Conflict(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            RepoError::Stale => AppError::Conflict("Resource was modified concurrently".to_string()),
            RepoError::Constraint(msg) => {
                tracing::error!("Constraint violation: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            RepoError::Connection(msg) => {
                tracing::error!("Database connection error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            RepoError::Query(msg) => {
                tracing::error!("Database query error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
