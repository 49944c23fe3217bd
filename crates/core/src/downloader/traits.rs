//! Trait definitions for the downloader module.

use async_trait::async_trait;

use super::error::DownloaderError;
use super::types::FetchedMedia;

/// Fetches remote media into the temp directory.
///
/// Implementations must be cancel-safe: the pipeline enforces its per-task
/// deadline by dropping the returned future.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the name of this downloader implementation.
    fn name(&self) -> &str;

    /// Fetches the media behind `locator`.
    async fn fetch(&self, locator: &str) -> Result<FetchedMedia, DownloaderError>;
}
