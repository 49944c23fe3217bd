//! Mock downloader for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::downloader::{is_valid_media_id, Downloader, DownloaderError, FetchedMedia};
use crate::media::MediaPaths;

use super::probe::ConcurrencyProbe;

/// Mock implementation of the Downloader trait.
///
/// Writes a placeholder source file for every successful fetch so later
/// stages and cleanup see real files. The media ID is taken from the text
/// after the last `=` of the locator (`...watch?v=abc` -> `abc`), falling back
/// to a counter.
///
/// # Example
///
/// ```rust,ignore
/// let downloader = MockDownloader::new(MediaPaths::new(dir.path()));
/// downloader.set_next_error(DownloaderError::info_failed("gone")).await;
/// ```
#[derive(Debug)]
pub struct MockDownloader {
    paths: MediaPaths,
    /// Locators passed to `fetch`, in call order.
    fetches: Arc<RwLock<Vec<String>>>,
    /// If set, the next fetch fails with this error.
    next_error: Arc<RwLock<Option<DownloaderError>>>,
    /// Simulated fetch duration.
    delay: Arc<RwLock<Duration>>,
    /// Whether to also produce a thumbnail.
    thumbnail: Arc<RwLock<bool>>,
    probe: ConcurrencyProbe,
}

impl MockDownloader {
    pub fn new(paths: MediaPaths) -> Self {
        Self {
            paths,
            fetches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            thumbnail: Arc::new(RwLock::new(false)),
            probe: ConcurrencyProbe::new(),
        }
    }

    /// Get all fetched locators.
    pub async fn recorded_fetches(&self) -> Vec<String> {
        self.fetches.read().await.clone()
    }

    /// Get the number of fetches performed.
    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: DownloaderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated fetch duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Produce a thumbnail alongside the source file.
    pub async fn set_thumbnail(&self, enabled: bool) {
        *self.thumbnail.write().await = enabled;
    }

    /// Concurrency observed inside `fetch`.
    pub fn probe(&self) -> &ConcurrencyProbe {
        &self.probe
    }

    fn media_id_for(locator: &str, n: usize) -> String {
        match locator.rsplit('=').next() {
            Some(id) if id != locator && is_valid_media_id(id) => id.to_string(),
            _ => format!("media{}", n),
        }
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, locator: &str) -> Result<FetchedMedia, DownloaderError> {
        let _inside = self.probe.enter();
        let n = {
            let mut fetches = self.fetches.write().await;
            fetches.push(locator.to_string());
            fetches.len()
        };

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let media_id = Self::media_id_for(locator, n);
        self.paths.ensure_dir().await?;
        let source_path = self.paths.source_path(&media_id);
        tokio::fs::write(&source_path, b"source").await?;

        let thumbnail = if *self.thumbnail.read().await {
            let path = self.paths.thumbnail_path(&media_id);
            tokio::fs::write(&path, b"jpeg").await?;
            Some(path)
        } else {
            None
        };

        Ok(FetchedMedia {
            title: format!("Title {}", media_id),
            media_id,
            source_path,
            thumbnail,
        })
    }
}
