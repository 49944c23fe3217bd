//! yt-dlp based downloader implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::media::MediaPaths;

use super::config::DownloaderConfig;
use super::error::DownloaderError;
use super::traits::Downloader;
use super::types::{FetchedMedia, RemoteMediaInfo};

/// Media IDs become file names, so only a conservative alphabet is accepted.
pub fn is_valid_media_id(id: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(id))
}

/// Downloader that shells out to yt-dlp.
pub struct YtDlpDownloader {
    config: DownloaderConfig,
    paths: MediaPaths,
    http: reqwest::Client,
}

impl YtDlpDownloader {
    /// Creates a downloader writing into the directory managed by `paths`.
    pub fn new(config: DownloaderConfig, paths: MediaPaths) -> Self {
        Self {
            config,
            paths,
            http: reqwest::Client::new(),
        }
    }

    fn map_spawn_error(&self, e: std::io::Error) -> DownloaderError {
        if e.kind() == std::io::ErrorKind::NotFound {
            DownloaderError::YtDlpNotFound {
                path: self.config.ytdlp_path.clone(),
            }
        } else {
            DownloaderError::Io(e)
        }
    }

    /// Builds yt-dlp arguments for the metadata lookup.
    fn build_info_args(&self, locator: &str) -> Vec<String> {
        vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            locator.to_string(),
        ]
    }

    /// Builds yt-dlp arguments for the actual download.
    fn build_download_args(&self, locator: &str, output: &Path) -> Vec<String> {
        vec![
            "-f".to_string(),
            self.config.format.clone(),
            "--no-playlist".to_string(),
            "--no-part".to_string(),
            "-o".to_string(),
            output.to_string_lossy().to_string(),
            locator.to_string(),
        ]
    }

    /// Builds ffmpeg arguments that scale the raw thumbnail to its final size.
    fn build_thumbnail_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let size = self.config.thumbnail_size;
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "quiet".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!(
                "scale='if(gt(iw,ih),{size},-2)':'if(gt(iw,ih),-2,{size})'"
            ),
            output.to_string_lossy().to_string(),
        ]
    }

    async fn lookup(&self, locator: &str) -> Result<RemoteMediaInfo, DownloaderError> {
        let output = Command::new(&self.config.ytdlp_path)
            .args(self.build_info_args(locator))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.map_spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloaderError::info_failed(format!(
                "yt-dlp exited with code {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        parse_info(&output.stdout)
    }

    async fn download(&self, locator: &str, output_path: &Path) -> Result<(), DownloaderError> {
        let output = Command::new(&self.config.ytdlp_path)
            .args(self.build_download_args(locator, output_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.map_spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DownloaderError::download_failed(
                format!("yt-dlp exited with code: {:?}", output.status.code()),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        if !tokio::fs::try_exists(output_path).await.unwrap_or(false) {
            return Err(DownloaderError::OutputMissing {
                path: output_path.to_path_buf(),
            });
        }

        Ok(())
    }

    /// Downloads and resizes the thumbnail. Returns `None` on any failure.
    async fn thumbnail(&self, media_id: &str, url: &str) -> Option<PathBuf> {
        let raw = self.paths.raw_thumbnail_path(media_id);
        let target = self.paths.thumbnail_path(media_id);

        let result = async {
            let bytes = self
                .http
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| e.to_string())?
                .bytes()
                .await
                .map_err(|e| e.to_string())?;
            tokio::fs::write(&raw, &bytes)
                .await
                .map_err(|e| e.to_string())?;

            let status = Command::new(&self.config.ffmpeg_path)
                .args(self.build_thumbnail_args(&raw, &target))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status()
                .await
                .map_err(|e| e.to_string())?;

            if status.success() {
                Ok(())
            } else {
                Err(format!("ffmpeg exited with code: {:?}", status.code()))
            }
        }
        .await;

        if let Err(e) = tokio::fs::remove_file(&raw).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %raw.display(), "Failed to remove raw thumbnail: {}", e);
            }
        }

        match result {
            Ok(()) => Some(target),
            Err(e) => {
                warn!(media_id, "Thumbnail unavailable: {}", e);
                None
            }
        }
    }
}

/// Parses `--dump-single-json` output and validates the media ID.
fn parse_info(stdout: &[u8]) -> Result<RemoteMediaInfo, DownloaderError> {
    let info: RemoteMediaInfo = serde_json::from_slice(stdout)
        .map_err(|e| DownloaderError::info_failed(format!("Failed to parse yt-dlp output: {}", e)))?;

    if !is_valid_media_id(&info.id) {
        return Err(DownloaderError::InvalidMediaId { id: info.id });
    }

    Ok(info)
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch(&self, locator: &str) -> Result<FetchedMedia, DownloaderError> {
        self.paths.ensure_dir().await?;

        let info = self.lookup(locator).await?;
        let source_path = self.paths.source_path(&info.id);
        debug!(media_id = %info.id, title = %info.title, "Resolved media info");

        self.download(locator, &source_path).await?;

        let thumbnail = match (&info.thumbnail, self.config.fetch_thumbnail) {
            (Some(url), true) => self.thumbnail(&info.id, url).await,
            _ => None,
        };

        info!(media_id = %info.id, path = %source_path.display(), "Fetched media");

        Ok(FetchedMedia {
            media_id: info.id,
            title: info.title,
            source_path,
            thumbnail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloader() -> YtDlpDownloader {
        YtDlpDownloader::new(DownloaderConfig::default(), MediaPaths::new("/tmp/tc"))
    }

    #[test]
    fn test_valid_media_ids() {
        assert!(is_valid_media_id("dQw4w9WgXcQ"));
        assert!(is_valid_media_id("a_b-c"));
        assert!(!is_valid_media_id(""));
        assert!(!is_valid_media_id("../etc"));
        assert!(!is_valid_media_id("a b"));
        assert!(!is_valid_media_id("a/b"));
    }

    #[test]
    fn test_download_args() {
        let args = downloader().build_download_args(
            "https://example.com/v",
            Path::new("/tmp/tc/abc.mp4"),
        );
        assert_eq!(
            args,
            vec![
                "-f",
                "bestaudio",
                "--no-playlist",
                "--no-part",
                "-o",
                "/tmp/tc/abc.mp4",
                "https://example.com/v"
            ]
        );
    }

    #[test]
    fn test_info_args_skip_playlists() {
        let args = downloader().build_info_args("https://example.com/v");
        assert!(args.contains(&"--dump-single-json".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/v"));
    }

    #[test]
    fn test_thumbnail_args_use_configured_size() {
        let args = downloader()
            .build_thumbnail_args(Path::new("/tmp/tc/abc_raw"), Path::new("/tmp/tc/abc.jpg"));
        assert!(args.iter().any(|a| a.contains("320")));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/tc/abc.jpg"));
    }

    #[test]
    fn test_parse_info() {
        let json = br#"{"id": "abc123", "title": "A Talk", "thumbnail": "https://i.example.com/t.jpg", "duration": 60}"#;
        let info = parse_info(json).unwrap();
        assert_eq!(info.id, "abc123");
        assert_eq!(info.title, "A Talk");
        assert_eq!(info.thumbnail.as_deref(), Some("https://i.example.com/t.jpg"));
    }

    #[test]
    fn test_parse_info_rejects_unsafe_id() {
        let json = br#"{"id": "../../x", "title": "t"}"#;
        assert!(matches!(
            parse_info(json),
            Err(DownloaderError::InvalidMediaId { .. })
        ));
    }

    #[test]
    fn test_parse_info_garbage() {
        assert!(matches!(
            parse_info(b"not json"),
            Err(DownloaderError::InfoFailed { .. })
        ));
    }
}
