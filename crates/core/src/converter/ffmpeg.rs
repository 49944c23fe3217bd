//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::media::MediaPaths;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::TranscodeResult;

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
    paths: MediaPaths,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter working inside the directory managed by `paths`.
    pub fn new(config: ConverterConfig, paths: MediaPaths) -> Self {
        Self { config, paths }
    }

    /// Builds ffmpeg arguments that drop the video stream and write mp3 audio.
    fn build_extract_args(&self, input_path: &Path, output_path: &Path) -> Vec<String> {
        vec![
            "-y".to_string(), // Overwrite output
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-vn".to_string(),
            output_path.to_string_lossy().to_string(),
        ]
    }

    /// Builds ffmpeg arguments for the segment muxer.
    fn build_segment_args(&self, input_path: &Path, pattern: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-c".to_string(),
            "copy".to_string(),
            "-map".to_string(),
            "0".to_string(),
            "-segment_time".to_string(),
            self.config.segment_time.clone(),
            "-f".to_string(),
            "segment".to_string(),
            "-vn".to_string(),
            pattern.to_string_lossy().to_string(),
        ]
    }

    /// Runs one ffmpeg invocation under the configured timeout.
    async fn run_ffmpeg(&self, args: Vec<String>) -> Result<(), ConverterError> {
        let child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        // Dropping the future on timeout kills the child.
        let output = match self.config.timeout() {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ConverterError::conversion_failed(
                format!("FFmpeg exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn transcode(&self, media_id: &str) -> Result<TranscodeResult, ConverterError> {
        let start = Instant::now();
        let source_path = self.paths.source_path(media_id);
        if !tokio::fs::try_exists(&source_path).await.unwrap_or(false) {
            return Err(ConverterError::InputNotFound { path: source_path });
        }

        let audio_path = self.paths.audio_path(media_id);
        self.run_ffmpeg(self.build_extract_args(&source_path, &audio_path))
            .await?;
        debug!(media_id, path = %audio_path.display(), "Extracted audio");

        let pattern = self.paths.segment_pattern(media_id);
        self.run_ffmpeg(self.build_segment_args(&audio_path, &pattern))
            .await?;

        let segments = self.paths.segments(media_id).await?;
        if segments.is_empty() {
            return Err(ConverterError::NoSegments {
                media_id: media_id.to_string(),
            });
        }

        info!(
            media_id,
            segments = segments.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Transcoded media"
        );

        Ok(TranscodeResult {
            audio_path,
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn converter(dir: &Path) -> FfmpegConverter {
        FfmpegConverter::new(ConverterConfig::default(), MediaPaths::new(dir))
    }

    #[test]
    fn test_build_extract_args() {
        let args = converter(Path::new("/tmp/tc"))
            .build_extract_args(Path::new("/tmp/tc/abc.mp4"), Path::new("/tmp/tc/abc.mp3"));

        assert_eq!(
            args,
            vec![
                "-y",
                "-loglevel",
                "quiet",
                "-i",
                "/tmp/tc/abc.mp4",
                "-vn",
                "/tmp/tc/abc.mp3"
            ]
        );
    }

    #[test]
    fn test_build_segment_args() {
        let args = converter(Path::new("/tmp/tc")).build_segment_args(
            Path::new("/tmp/tc/abc.mp3"),
            Path::new("/tmp/tc/abc.%02d.mp3"),
        );

        assert!(args.contains(&"segment".to_string()));
        assert!(args.contains(&"00:45:00".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-c" && w[1] == "copy"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/tc/abc.%02d.mp3"));
    }

    #[tokio::test]
    async fn test_transcode_missing_input() {
        let dir = TempDir::new().unwrap();
        let result = converter(dir.path()).transcode("missing").await;
        assert!(matches!(result, Err(ConverterError::InputNotFound { .. })));
    }

    #[tokio::test]
    async fn test_transcode_ffmpeg_not_found() {
        let dir = TempDir::new().unwrap();
        let paths = MediaPaths::new(dir.path());
        tokio::fs::write(paths.source_path("abc"), b"data")
            .await
            .unwrap();

        let config = ConverterConfig {
            ffmpeg_path: dir.path().join("no-such-ffmpeg"),
            ..Default::default()
        };
        let result = FfmpegConverter::new(config, paths).transcode("abc").await;
        assert!(matches!(result, Err(ConverterError::FfmpegNotFound { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_timeout_waits_for_ffmpeg() {
        let dir = TempDir::new().unwrap();
        let config = ConverterConfig {
            ffmpeg_path: "sh".into(),
            timeout_secs: 0,
            ..Default::default()
        };
        let converter = FfmpegConverter::new(config, MediaPaths::new(dir.path()));

        let args = vec!["-c".to_string(), "sleep 0.2".to_string()];
        converter.run_ffmpeg(args).await.unwrap();
    }
}
