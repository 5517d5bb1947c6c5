//! The single error taxonomy shared by every layer.
//!
//! Services return `ApiError` tags; the translation to an HTTP status lives
//! only in the `IntoResponse` impl, so nothing below the handlers ever
//! formats a response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Create was called without a cover file.
    #[error("cover is required")]
    MissingCover,

    /// Declared MIME type is outside the image allow-list. Carries the
    /// offending type for logging.
    #[error("Only PNG, JPEG or WEBP images are allowed")]
    UnsupportedType(String),

    /// Upload exceeded the configured size cap.
    #[error("File too large")]
    PayloadTooLarge { actual: u64, limit: u64 },

    /// Update request with no name, no artist and no file.
    #[error("No fields provided to update")]
    NoFieldsProvided,

    /// Input shape failure (empty name, non-positive id, ...).
    #[error("{0}")]
    Validation(String),

    #[error("Product not found")]
    ProductNotFound(i64),

    /// A stored cover the caller asked for does not exist.
    #[error("upload `{0}` not found")]
    BlobNotFound(String),

    /// Blob name failed the traversal guard.
    #[error("invalid filename")]
    InvalidFilename,

    /// Multipart mechanics (unreadable field, missing boundary, ...).
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCover
            | ApiError::UnsupportedType(_)
            | ApiError::InvalidFilename
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NoFieldsProvided | ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ProductNotFound(_) | ApiError::BlobNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Sqlx(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            // Storage failures are logged here and surfaced as an opaque 500;
            // the caller never sees driver internals.
            ApiError::Sqlx(err) => {
                tracing::error!("database error: {err}");
                "Internal Server Error".to_string()
            }
            ApiError::Io(err) => {
                tracing::error!("i/o error: {err}");
                "Internal Server Error".to_string()
            }
            ApiError::UnsupportedType(mime) => {
                tracing::debug!("rejected upload with content type `{mime}`");
                self.to_string()
            }
            ApiError::PayloadTooLarge { actual, limit } => {
                tracing::debug!("rejected upload of {actual} bytes (limit {limit})");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
