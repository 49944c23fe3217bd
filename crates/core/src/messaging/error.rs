//! Error types for the messaging module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to the messaging platform.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// Network-level failure.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The platform rejected the request.
    #[error("API error ({method}): {description}")]
    ApiError { method: String, description: String },

    /// Response could not be decoded.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// A file to upload could not be read.
    #[error("Failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MessagingError {
    /// Creates an API error for the given method.
    pub fn api(method: impl Into<String>, description: impl Into<String>) -> Self {
        Self::ApiError {
            method: method.into(),
            description: description.into(),
        }
    }

    /// Whether this error is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_))
    }
}

impl From<reqwest::Error> for MessagingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::ParseError(e.to_string())
        } else {
            Self::ConnectionFailed(e.to_string())
        }
    }
}
