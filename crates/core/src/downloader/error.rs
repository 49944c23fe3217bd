//! Error types for the downloader module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching remote media.
#[derive(Debug, Error)]
pub enum DownloaderError {
    /// yt-dlp binary not found.
    #[error("yt-dlp not found at path: {path}")]
    YtDlpNotFound { path: PathBuf },

    /// Metadata lookup failed.
    #[error("Failed to get media info: {reason}")]
    InfoFailed { reason: String },

    /// The media ID reported by the source is unusable as a file name.
    #[error("Invalid media ID: {id:?}")]
    InvalidMediaId { id: String },

    /// Download process failed.
    #[error("Download failed: {reason}")]
    DownloadFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Download finished but the expected file is missing.
    #[error("Downloaded file missing: {path}")]
    OutputMissing { path: PathBuf },

    /// The per-task deadline expired.
    #[error("Download timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloaderError {
    /// Creates a new info failed error.
    pub fn info_failed(reason: impl Into<String>) -> Self {
        Self::InfoFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new download failed error with stderr output.
    pub fn download_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::DownloadFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}
