//! Mock uploader for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::uploader::{UploadError, UploadReceipt, Uploader};

/// A recorded upload for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub media_id: String,
    pub title: String,
    pub item_prefix: String,
}

/// Mock implementation of the Uploader trait.
#[derive(Debug, Default)]
pub struct MockUploader {
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    /// If set, the next upload fails with this error.
    next_error: Arc<RwLock<Option<UploadError>>>,
}

impl MockUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded uploads.
    pub async fn recorded_uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    /// Get the number of uploads attempted.
    pub async fn upload_count(&self) -> usize {
        self.uploads.read().await.len()
    }

    /// Configure the next upload to fail with the given error.
    pub async fn set_next_error(&self, error: UploadError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl Uploader for MockUploader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(
        &self,
        media_id: &str,
        title: &str,
        item_prefix: &str,
    ) -> Result<UploadReceipt, UploadError> {
        self.uploads.write().await.push(RecordedUpload {
            media_id: media_id.to_string(),
            title: title.to_string(),
            item_prefix: item_prefix.to_string(),
        });

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let item_id = format!("{}{}", item_prefix, media_id);
        Ok(UploadReceipt {
            url: format!("https://archive.example/{}/audio.mp3", item_id),
            item_id,
        })
    }
}
