//! Error handling for the gate check-in service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected user input (empty token etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Another validation is still in flight
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// No video input device available
    #[error("No camera found")]
    NoCameraFound,

    /// Camera could not be opened or stopped delivering frames
    #[error("Camera unavailable ({device_id}): {message}")]
    CameraUnavailable { device_id: String, message: String },

    /// Back-end API returned an unexpected response
    #[error("API error: {0}")]
    Api(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            Error::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            Error::NoCameraFound => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NO_CAMERA",
                self.to_string(),
            ),
            Error::CameraUnavailable { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CAMERA_UNAVAILABLE",
                self.to_string(),
            ),
            Error::Api(msg) => (StatusCode::BAD_GATEWAY, "API_ERROR", msg.clone()),
            Error::Serialization(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERIALIZATION_ERROR",
                e.to_string(),
            ),
            Error::Http(e) => (StatusCode::BAD_GATEWAY, "HTTP_ERROR", e.to_string()),
            Error::Io(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                e.to_string(),
            ),
            Error::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                msg.clone(),
            ),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error_code = %error_code,
                message = %message,
                "Request error"
            );
        } else {
            tracing::warn!(
                status = %status,
                error_code = %error_code,
                message = %message,
                "Request rejected"
            );
        }

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
