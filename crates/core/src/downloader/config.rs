//! Configuration for the downloader module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the yt-dlp based downloader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Path to yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Path to ffmpeg binary (thumbnail resizing).
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// yt-dlp format selector.
    #[serde(default = "default_format")]
    pub format: String,

    /// Whether to fetch and resize the media thumbnail.
    #[serde(default = "default_fetch_thumbnail")]
    pub fetch_thumbnail: bool,

    /// Longest edge of the resized thumbnail in pixels.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_format() -> String {
    "bestaudio".to_string()
}

fn default_fetch_thumbnail() -> bool {
    true
}

fn default_thumbnail_size() -> u32 {
    320
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            ffmpeg_path: default_ffmpeg_path(),
            format: default_format(),
            fetch_thumbnail: default_fetch_thumbnail(),
            thumbnail_size: default_thumbnail_size(),
        }
    }
}
