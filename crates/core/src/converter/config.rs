//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the FFmpeg-based converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Maximum duration of one audio segment, as `HH:MM:SS`.
    #[serde(default = "default_segment_time")]
    pub segment_time: String,

    /// Timeout for a single ffmpeg invocation in seconds. 0 disables it.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_segment_time() -> String {
    "00:45:00".to_string()
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

fn default_log_level() -> String {
    "quiet".to_string()
}

impl ConverterConfig {
    /// Per-invocation deadline, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            segment_time: default_segment_time(),
            timeout_secs: default_timeout(),
            ffmpeg_log_level: default_log_level(),
        }
    }
}
