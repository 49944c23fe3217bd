//! archive.org uploader using the S3-compatible API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::media::{MediaPaths, EXT_AUDIO};

use super::config::ArchiveConfig;
use super::error::UploadError;
use super::traits::Uploader;
use super::types::UploadReceipt;

/// Uploads audio to archive.org items.
pub struct ArchiveUploader {
    client: Client,
    config: ArchiveConfig,
    auth: String,
    paths: MediaPaths,
}

impl ArchiveUploader {
    /// Creates a new uploader. Fails if no credentials are configured.
    pub fn new(config: ArchiveConfig, paths: MediaPaths) -> Result<Self, UploadError> {
        let auth = config
            .auth_string
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or(UploadError::NotConfigured)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UploadError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            auth,
            paths,
        })
    }

    /// URL of the audio file inside item `item_id`.
    fn item_url(&self, item_id: &str) -> String {
        format!(
            "{}/{}/audio.{}",
            self.config.base_url.trim_end_matches('/'),
            item_id,
            EXT_AUDIO
        )
    }

    fn headers(&self, title: &str) -> Result<HeaderMap, UploadError> {
        let invalid = |e: reqwest::header::InvalidHeaderValue| {
            UploadError::ConnectionFailed(format!("invalid header value: {}", e))
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
        headers.insert("X-Amz-Auto-Make-Bucket", HeaderValue::from_static("1"));
        headers.insert("X-Archive-Meta-Mediatype", HeaderValue::from_static("audio"));
        // Header values must be visible ASCII; titles are percent-encoded in the
        // `uri()` form archive.org decodes for metadata headers.
        headers.insert(
            "X-Archive-Meta-Title",
            HeaderValue::from_str(&encode_meta(title)).map_err(invalid)?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("LOW {}", self.auth)).map_err(invalid)?,
        );
        Ok(headers)
    }
}

/// Encodes a metadata value for an `X-Archive-Meta-*` header.
fn encode_meta(value: &str) -> String {
    if value.is_ascii() && !value.chars().any(|c| c.is_ascii_control()) {
        value.to_string()
    } else {
        format!("uri({})", urlencoding::encode(value))
    }
}

#[async_trait]
impl Uploader for ArchiveUploader {
    fn name(&self) -> &str {
        "archive.org"
    }

    async fn upload(
        &self,
        media_id: &str,
        title: &str,
        item_prefix: &str,
    ) -> Result<UploadReceipt, UploadError> {
        let start = Instant::now();
        let path = self.paths.audio_path(media_id);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UploadError::FileNotFound { path })
            }
            Err(e) => return Err(e.into()),
        };

        let item_id = format!("{}{}", item_prefix, Uuid::new_v4());
        let url = self.item_url(&item_id);
        debug!(media_id, url = %url, bytes = data.len(), "Uploading audio");

        let response = self
            .client
            .put(&url)
            .headers(self.headers(title)?)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            media_id,
            item_id = %item_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Uploaded audio to archive"
        );

        Ok(UploadReceipt { item_id, url })
    }
}
