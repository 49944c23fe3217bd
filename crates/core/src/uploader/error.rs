//! Error types for the uploader module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while archiving audio.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Uploads are not configured.
    #[error("Archive credentials are not configured")]
    NotConfigured,

    /// The audio file to upload is missing.
    #[error("Audio file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Could not reach the archive.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The archive answered with a non-success status.
    #[error("Upload rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        UploadError::ConnectionFailed(e.to_string())
    }
}

impl UploadError {
    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
