//! Configuration for the pipeline module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::uploader::ArchiveFeed;

/// Configuration for the staged pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Workers pulling from the fetch channel.
    #[serde(default = "default_fetch_workers")]
    pub fetch_workers: usize,

    /// Workers pulling from the transcode channel. Transcoding is CPU-bound,
    /// keep this small.
    #[serde(default = "default_transcode_workers")]
    pub transcode_workers: usize,

    /// Workers pulling from the publish channel.
    #[serde(default = "default_publish_workers")]
    pub publish_workers: usize,

    /// Shared directory for every temporary artifact.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Deadline for a single fetch in seconds. 0 disables it.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Archive feed naming. `None` disables archival.
    ///
    /// Resolved from the `[archive]` section, never read from `[pipeline]`.
    #[serde(skip)]
    pub archive: Option<ArchiveFeed>,
}

fn default_fetch_workers() -> usize {
    5
}

fn default_transcode_workers() -> usize {
    2
}

fn default_publish_workers() -> usize {
    5
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./tmp/")
}

fn default_fetch_timeout() -> u64 {
    1800 // 30 minutes
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_workers: default_fetch_workers(),
            transcode_workers: default_transcode_workers(),
            publish_workers: default_publish_workers(),
            temp_dir: default_temp_dir(),
            fetch_timeout_secs: default_fetch_timeout(),
            archive: None,
        }
    }
}

impl PipelineConfig {
    /// Sets the archive feed (or disables archival with `None`).
    pub fn with_archive(mut self, archive: Option<ArchiveFeed>) -> Self {
        self.archive = archive;
        self
    }

    /// Sets the temp directory.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }
}
