//! Mock converter for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{Converter, ConverterError, TranscodeResult};
use crate::media::MediaPaths;

use super::probe::ConcurrencyProbe;

/// Mock implementation of the Converter trait.
///
/// Writes `segment_count` placeholder segments per media ID. The full-length
/// audio file is only written when enabled, so tests can count artifacts
/// exactly.
#[derive(Debug)]
pub struct MockConverter {
    paths: MediaPaths,
    /// Media IDs passed to `transcode`, in call order.
    transcodes: Arc<RwLock<Vec<String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated transcode duration.
    delay: Arc<RwLock<Duration>>,
    /// Segments written per transcode.
    segment_count: Arc<RwLock<u32>>,
    /// Whether to also write the full-length audio.
    write_full_audio: Arc<RwLock<bool>>,
    probe: ConcurrencyProbe,
}

impl MockConverter {
    pub fn new(paths: MediaPaths) -> Self {
        Self {
            paths,
            transcodes: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            segment_count: Arc::new(RwLock::new(1)),
            write_full_audio: Arc::new(RwLock::new(false)),
            probe: ConcurrencyProbe::new(),
        }
    }

    /// Get all transcoded media IDs.
    pub async fn recorded_transcodes(&self) -> Vec<String> {
        self.transcodes.read().await.clone()
    }

    /// Get the number of transcodes performed.
    pub async fn transcode_count(&self) -> usize {
        self.transcodes.read().await.len()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated transcode duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Set how many segments each transcode produces.
    pub async fn set_segment_count(&self, count: u32) {
        *self.segment_count.write().await = count;
    }

    /// Also write `<id>.mp3`.
    pub async fn set_write_full_audio(&self, enabled: bool) {
        *self.write_full_audio.write().await = enabled;
    }

    /// Concurrency observed inside `transcode`.
    pub fn probe(&self) -> &ConcurrencyProbe {
        &self.probe
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(&self, media_id: &str) -> Result<TranscodeResult, ConverterError> {
        let _inside = self.probe.enter();
        self.transcodes.write().await.push(media_id.to_string());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let audio_path = self.paths.audio_path(media_id);
        if *self.write_full_audio.read().await {
            tokio::fs::write(&audio_path, b"audio").await?;
        }

        for index in 0..*self.segment_count.read().await {
            tokio::fs::write(self.paths.segment_path(media_id, index), b"segment").await?;
        }

        Ok(TranscodeResult {
            audio_path,
            segments: self.paths.segments(media_id).await?,
        })
    }
}
