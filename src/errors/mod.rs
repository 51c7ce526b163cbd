//! Error types for the Dify client.
//!
//! The taxonomy mirrors how failures surface to callers: configuration
//! problems are caught before any network activity, transport problems wrap
//! the underlying status or I/O failure, and cancellation is kept distinct
//! from ordinary network errors so callers can tell an aborted request from
//! a broken one.

use thiserror::Error;

/// Result type alias for Dify operations.
pub type DifyResult<T> = Result<T, DifyError>;

/// Error type for Dify client operations.
#[derive(Debug, Error)]
pub enum DifyError {
    /// Configuration error (missing API key, invalid base URL, etc.)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// Authentication rejected by the API (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Error message from the API.
        message: String,
    },

    /// Any other non-2xx API response.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message, taken from the API error body when available.
        message: String,
        /// Raw response body, if one was received.
        body: Option<String>,
    },

    /// Network/connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Request timeout.
    #[error("Request timeout: {message}")]
    Timeout {
        /// Error message.
        message: String,
    },

    /// The request was cancelled through the caller's cancellation token.
    #[error("Request cancelled")]
    Cancelled,

    /// Streaming error (the response body stream failed mid-read).
    #[error("Stream error: {message}")]
    Stream {
        /// Error message.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },
}

impl DifyError {
    /// Returns true if this error represents a cancelled request.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, DifyError::Cancelled)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        DifyError::Configuration {
            message: message.into(),
        }
    }
}

/// Error body returned by the Dify API.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub code: Option<String>,
    /// HTTP status echoed in the body.
    pub status: Option<u16>,
    /// Human-readable error message.
    pub message: String,
}

impl From<reqwest::Error> for DifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DifyError::Timeout {
                message: err.to_string(),
            }
        } else {
            DifyError::Connection {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for DifyError {
    fn from(err: serde_json::Error) -> Self {
        DifyError::Serialization {
            message: err.to_string(),
        }
    }
}
