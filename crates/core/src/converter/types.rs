//! Types for the converter module.

use std::path::PathBuf;

use crate::media::Segment;

/// Output of a successful transcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeResult {
    /// Full-length extracted audio.
    pub audio_path: PathBuf,
    /// Bounded-duration segments, ascending by index.
    pub segments: Vec<Segment>,
}
