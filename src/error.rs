//! Error types for the media gateway
//!
//! Layer errors (`UploadError`, `StoreError`) are folded into `AppError`,
//! which implements `IntoResponse` for the JSON error bodies clients see.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub use crate::data::StoreError;
pub use crate::storage::UploadError;

/// Body returned when a request carries no file under the expected field
pub const NO_FILE_MESSAGE: &str = "No file uploaded";

/// Body returned when the media provider rejects or fails an upload
pub const PROVIDER_FAILURE_MESSAGE: &str = "Cloudinary upload failed";

/// Body returned for every other server-side failure
pub const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// The expected file field is absent (400)
    #[error("{0}")]
    MissingFile(&'static str),

    /// The multipart body could not be read (status chosen by the parser)
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// Media provider upload failed (500)
    #[error("Media upload failed: {0}")]
    ProviderUpload(#[from] UploadError),

    /// Record store failure (500)
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Status code, client-facing message and metric label for this error
    fn parts(&self) -> (StatusCode, String, &'static str) {
        match self {
            AppError::MissingFile(message) => {
                (StatusCode::BAD_REQUEST, message.to_string(), "missing_file")
            }
            AppError::Multipart(e) => (e.status(), e.body_text(), "multipart"),
            AppError::ProviderUpload(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                PROVIDER_FAILURE_MESSAGE.to_string(),
                "provider_upload",
            ),
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                SERVER_ERROR_MESSAGE.to_string(),
                "store",
            ),
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                SERVER_ERROR_MESSAGE.to_string(),
                "config",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                SERVER_ERROR_MESSAGE.to_string(),
                "internal",
            ),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Server-side details are logged, never sent to the client.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
        } else {
            tracing::debug!(error = %self, error_type, "Request rejected");
        }

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[error_type])
            .inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
