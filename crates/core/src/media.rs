//! Temporary artifact naming for fetched and transcoded media.
//!
//! Every stage addresses the shared temp directory purely through names derived
//! from the media ID:
//!
//! - `<dir>/<id>.mp4` - fetched source media
//! - `<dir>/<id>.mp3` - full-length extracted audio
//! - `<dir>/<id>.<NN>.mp3` - bounded-duration audio segments
//! - `<dir>/<id>.jpg` - resized thumbnail
//! - `<dir>/<id>_raw` - thumbnail download scratch file

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

/// Extension of the fetched source media.
pub const EXT_SOURCE: &str = "mp4";
/// Extension of extracted audio and its segments.
pub const EXT_AUDIO: &str = "mp3";
/// Extension of the resized thumbnail.
pub const EXT_THUMBNAIL: &str = "jpg";

/// One transcoded audio segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Zero-based segment index as written by the segmenter.
    pub index: u32,
    /// Path on disk.
    pub path: PathBuf,
}

impl Segment {
    /// Two-digit, zero-padded index label (`"00"`, `"01"`, ...).
    pub fn label(&self) -> String {
        format!("{:02}", self.index)
    }
}

/// Resolves artifact paths inside the shared temp directory.
#[derive(Debug, Clone)]
pub struct MediaPaths {
    dir: PathBuf,
}

impl MediaPaths {
    /// Creates a resolver rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The temp directory itself.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the temp directory if it does not exist.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    pub fn source_path(&self, media_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", media_id, EXT_SOURCE))
    }

    pub fn audio_path(&self, media_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", media_id, EXT_AUDIO))
    }

    /// Output pattern handed to the ffmpeg segment muxer.
    pub fn segment_pattern(&self, media_id: &str) -> PathBuf {
        self.dir.join(format!("{}.%02d.{}", media_id, EXT_AUDIO))
    }

    pub fn segment_path(&self, media_id: &str, index: u32) -> PathBuf {
        self.dir
            .join(format!("{}.{:02}.{}", media_id, index, EXT_AUDIO))
    }

    pub fn thumbnail_path(&self, media_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", media_id, EXT_THUMBNAIL))
    }

    pub fn raw_thumbnail_path(&self, media_id: &str) -> PathBuf {
        self.dir.join(format!("{}_raw", media_id))
    }

    /// Lists the segments of `media_id` in discovery order (ascending index).
    pub async fn segments(&self, media_id: &str) -> io::Result<Vec<Segment>> {
        let mut segments = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(index) = parse_segment_index(name, media_id) {
                segments.push(Segment {
                    index,
                    path: entry.path(),
                });
            }
        }

        segments.sort_by_key(|s| s.index);
        Ok(segments)
    }

    /// Every temp artifact that belongs to `media_id` and currently exists.
    pub async fn artifacts(&self, media_id: &str) -> io::Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = self
            .segments(media_id)
            .await?
            .into_iter()
            .map(|s| s.path)
            .collect();

        for candidate in [
            self.audio_path(media_id),
            self.source_path(media_id),
            self.thumbnail_path(media_id),
            self.raw_thumbnail_path(media_id),
        ] {
            if fs::try_exists(&candidate).await.unwrap_or(false) {
                paths.push(candidate);
            }
        }

        Ok(paths)
    }

    /// Deletes every artifact of `media_id`. Returns the number of files removed.
    pub async fn remove_artifacts(&self, media_id: &str) -> io::Result<usize> {
        let mut removed = 0;
        for path in self.artifacts(media_id).await? {
            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed temp artifact");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), "Failed to remove temp artifact: {}", e),
            }
        }
        Ok(removed)
    }

    /// Deletes every regular file in the temp directory, whatever task it belongs to.
    pub async fn purge(&self) -> io::Result<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), "Failed to remove file: {}", e),
            }
        }

        Ok(removed)
    }
}

/// Parses `<media_id>.<NN>.mp3` into `NN`.
fn parse_segment_index(file_name: &str, media_id: &str) -> Option<u32> {
    let rest = file_name.strip_prefix(media_id)?.strip_prefix('.')?;
    let digits = rest.strip_suffix(EXT_AUDIO)?.strip_suffix('.')?;
    if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn touch(path: &Path) {
        fs::write(path, b"data").await.unwrap();
    }

    #[test]
    fn test_path_convention() {
        let paths = MediaPaths::new("/tmp/tc");
        assert_eq!(paths.source_path("abc"), PathBuf::from("/tmp/tc/abc.mp4"));
        assert_eq!(paths.audio_path("abc"), PathBuf::from("/tmp/tc/abc.mp3"));
        assert_eq!(
            paths.segment_pattern("abc"),
            PathBuf::from("/tmp/tc/abc.%02d.mp3")
        );
        assert_eq!(
            paths.segment_path("abc", 3),
            PathBuf::from("/tmp/tc/abc.03.mp3")
        );
        assert_eq!(paths.thumbnail_path("abc"), PathBuf::from("/tmp/tc/abc.jpg"));
    }

    #[test]
    fn test_parse_segment_index() {
        assert_eq!(parse_segment_index("abc.00.mp3", "abc"), Some(0));
        assert_eq!(parse_segment_index("abc.12.mp3", "abc"), Some(12));
        assert_eq!(parse_segment_index("abc.104.mp3", "abc"), Some(104));
        assert_eq!(parse_segment_index("abc.mp3", "abc"), None);
        assert_eq!(parse_segment_index("abc.1.mp3", "abc"), None);
        assert_eq!(parse_segment_index("abcd.00.mp3", "abc"), None);
        assert_eq!(parse_segment_index("abc.xx.mp3", "abc"), None);
        assert_eq!(parse_segment_index("abc.00.mp4", "abc"), None);
    }

    #[tokio::test]
    async fn test_segments_sorted_ascending() {
        let dir = TempDir::new().unwrap();
        let paths = MediaPaths::new(dir.path());
        touch(&paths.segment_path("vid", 2)).await;
        touch(&paths.segment_path("vid", 0)).await;
        touch(&paths.segment_path("vid", 1)).await;
        touch(&paths.segment_path("other", 0)).await;
        touch(&paths.audio_path("vid")).await;

        let segments = paths.segments("vid").await.unwrap();
        let indices: Vec<u32> = segments.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(segments[1].label(), "01");
    }

    #[tokio::test]
    async fn test_remove_artifacts_leaves_other_media() {
        let dir = TempDir::new().unwrap();
        let paths = MediaPaths::new(dir.path());
        touch(&paths.segment_path("vid", 0)).await;
        touch(&paths.audio_path("vid")).await;
        touch(&paths.source_path("vid")).await;
        touch(&paths.thumbnail_path("vid")).await;
        touch(&paths.source_path("vid2")).await;

        let removed = paths.remove_artifacts("vid").await.unwrap();
        assert_eq!(removed, 4);
        assert!(paths.source_path("vid2").exists());
        assert!(!paths.source_path("vid").exists());
    }

    #[tokio::test]
    async fn test_purge_removes_everything() {
        let dir = TempDir::new().unwrap();
        let paths = MediaPaths::new(dir.path());
        touch(&paths.source_path("a")).await;
        touch(&paths.source_path("b")).await;
        touch(&paths.raw_thumbnail_path("c")).await;

        assert_eq!(paths.purge().await.unwrap(), 3);
        assert!(paths.segments("a").await.unwrap().is_empty());
    }
}
