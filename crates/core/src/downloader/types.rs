//! Types for the downloader module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedMedia {
    /// Stable identifier from the source (e.g. the video ID).
    pub media_id: String,
    /// Human-readable title.
    pub title: String,
    /// Where the fetched media was written.
    pub source_path: PathBuf,
    /// Resized thumbnail, if one could be produced.
    pub thumbnail: Option<PathBuf>,
}

/// Subset of `yt-dlp --dump-single-json` output we care about.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteMediaInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}
