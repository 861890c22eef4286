//! Error types for manifest-dl
//!
//! Only run-level failures are modelled as [`Error`]. Anything that goes wrong
//! for a single manifest row (bad shape, non-200 status, transport failure,
//! write failure) is a value in [`crate::types`] and is reported as event text
//! without aborting the run.
//!
//! This module also provides:
//! - HTTP status code mapping for the API layer
//! - A structured JSON error envelope with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for manifest-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for manifest-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.timeout")
        key: Option<String>,
    },

    /// The uploaded manifest could not be read
    #[error("invalid manifest: {0}")]
    Manifest(#[from] ManifestError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The consumer of a run's event stream went away, or the server is shutting down
    #[error("run cancelled")]
    Cancelled,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Manifest parsing errors
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The input has no lines at all, so there is no header to skip
    #[error("manifest is empty: expected a header line")]
    Empty,

    /// The input is not valid UTF-8
    #[error("manifest is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Standardized API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "empty_manifest",
///     "message": "invalid manifest: manifest is empty: expected a header line"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "empty_manifest", "config_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::Manifest(_) => 422,

            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,

            Error::Network(_) => 502,

            Error::Cancelled => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Manifest(e) => match e {
                ManifestError::Empty => "empty_manifest",
                ManifestError::Encoding(_) => "invalid_encoding",
            },
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Cancelled => "cancelled",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
