//! Error types for the Arxiver server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::arxiv::ArxivError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("arXiv error: {0}")]
    Arxiv(#[from] ArxivError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-specific errors
///
/// Backends classify their failures into these kinds; callers of the
/// thumbnail pipeline only ever see "operation failed".
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage credentials rejected: {0}")]
    Credentials(String),

    #[error("Storage request failed: {0}")]
    Client(String),

    #[error("Storage temporarily unavailable: {0}")]
    Transient(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Content type not allowed: {0}")]
    ContentTypeNotAllowed(String),

    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Unauthorized(msg) => {
                tracing::debug!("Rejected request: {}", msg);
                (
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "Invalid or missing credentials".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                match e {
                    StorageError::NotFound(key) => {
                        (StatusCode::NOT_FOUND, "not_found", format!("Object not found: {}", key))
                    }
                    StorageError::InvalidKey(_) | StorageError::ContentTypeNotAllowed(_) => {
                        (StatusCode::BAD_REQUEST, "bad_request", e.to_string())
                    }
                    StorageError::Credentials(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "storage_credentials_error",
                        "Storage credentials error".to_string(),
                    ),
                    StorageError::Transient(_) => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "storage_unavailable",
                        "Storage temporarily unavailable".to_string(),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "storage_error",
                        "Storage error".to_string(),
                    ),
                }
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                )
            }
            AppError::Arxiv(e) => {
                tracing::error!("arXiv request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "arxiv_error",
                    "Failed to fetch arXiv feed".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
