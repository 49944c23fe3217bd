//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConverterError;
use super::types::TranscodeResult;

/// Turns fetched source media into segmented audio.
///
/// Inputs and outputs are addressed by media ID inside the shared temp
/// directory, see [`crate::media::MediaPaths`].
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Extracts the audio track of `media_id` and splits it into segments.
    async fn transcode(&self, media_id: &str) -> Result<TranscodeResult, ConverterError>;
}
