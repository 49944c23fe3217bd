//! Trait definitions for the uploader module.

use async_trait::async_trait;

use super::error::UploadError;
use super::types::UploadReceipt;

/// Long-term storage for extracted audio.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Returns the name of this uploader implementation.
    fn name(&self) -> &str;

    /// Stores the full-length audio of `media_id` under a fresh item whose
    /// identifier starts with `item_prefix`.
    async fn upload(
        &self,
        media_id: &str,
        title: &str,
        item_prefix: &str,
    ) -> Result<UploadReceipt, UploadError>;
}
