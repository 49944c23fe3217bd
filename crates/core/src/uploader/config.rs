//! Configuration for the archive uploader.

use serde::{Deserialize, Serialize};

use super::types::ArchiveFeed;

/// Configuration for archive.org uploads.
///
/// Archival is enabled exactly when `auth_string` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// `<access>:<secret>` S3 credentials. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub auth_string: Option<String>,

    /// S3-compatible endpoint items are PUT to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Prefix of every item identifier.
    #[serde(default = "default_item_prefix")]
    pub item_prefix: String,

    /// Search endpoint used to build the podcast feed URL.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Query suffix appended after the encoded item prefix.
    #[serde(default = "default_search_params")]
    pub search_params: String,

    /// Upload request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://s3.us.archive.org/".to_string()
}

fn default_item_prefix() -> String {
    "youtube-audio-".to_string()
}

fn default_search_url() -> String {
    "https://archive.org/advancedsearch.php?q=".to_string()
}

fn default_search_params() -> String {
    "&rows=100&page=1&callback=callback&save=yes&output=rss".to_string()
}

fn default_timeout() -> u64 {
    1800
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            auth_string: None,
            base_url: default_base_url(),
            item_prefix: default_item_prefix(),
            search_url: default_search_url(),
            search_params: default_search_params(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ArchiveConfig {
    /// Whether uploads are enabled.
    pub fn is_enabled(&self) -> bool {
        self.auth_string
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Feed naming derived from this configuration.
    pub fn feed(&self) -> ArchiveFeed {
        ArchiveFeed {
            item_prefix: self.item_prefix.clone(),
            search_url: self.search_url.clone(),
            search_params: self.search_params.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let config = ArchiveConfig::default();
        assert!(!config.is_enabled());
        assert_eq!(config.item_prefix, "youtube-audio-");
    }

    #[test]
    fn test_blank_auth_string_is_disabled() {
        let config = ArchiveConfig {
            auth_string: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_auth_string_not_serialized() {
        let config = ArchiveConfig {
            auth_string: Some("access:secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("access:secret"));
    }
}
