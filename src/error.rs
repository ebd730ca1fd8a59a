// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::{generation::GenerationError, store::StoreError};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (acting on a community without membership)
    NotAMember(String),

    // 403 Forbidden (member, but not allowed to do this)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (duplicate username or community name)
    DuplicateName(String),

    // 502 Bad Gateway (generation service unreachable or returned garbage)
    GenerationFailure(String),

    // 503 Service Unavailable (store unavailable)
    PersistenceFailure(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg) => write!(f, "internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "bad request: {}", msg),
            AppError::AuthError(msg) => write!(f, "unauthorized: {}", msg),
            AppError::NotAMember(msg) => write!(f, "not a member: {}", msg),
            AppError::Forbidden(msg) => write!(f, "forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "not found: {}", msg),
            AppError::DuplicateName(msg) => write!(f, "duplicate name: {}", msg),
            AppError::GenerationFailure(msg) => write!(f, "generation failed: {}", msg),
            AppError::PersistenceFailure(msg) => write!(f, "persistence failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotAMember(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::DuplicateName(msg) => (StatusCode::CONFLICT, msg),
            AppError::GenerationFailure(msg) => {
                tracing::warn!("Generation failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::PersistenceFailure(msg) => {
                tracing::error!("Persistence failure: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage is temporarily unavailable".to_string(),
                )
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Store errors keep their meaning at the HTTP boundary:
/// conflicts become `DuplicateName`, missing rows `NotFound`, the rest `PersistenceFailure`.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists { .. } => AppError::DuplicateName(err.to_string()),
            StoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            _ => AppError::PersistenceFailure(err.to_string()),
        }
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::GenerationFailure(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
