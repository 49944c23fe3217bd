//! Types for the uploader module.

use serde::{Deserialize, Serialize};

/// Naming of archive items and of the podcast feed that lists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveFeed {
    pub item_prefix: String,
    pub search_url: String,
    pub search_params: String,
}

impl ArchiveFeed {
    /// Item prefix shared by every upload of one requester: `<item_prefix><chat_id>-`.
    pub fn item_prefix_for(&self, chat_id: i64) -> String {
        format!("{}{}-", self.item_prefix, chat_id)
    }

    /// Feed URL listing every item that starts with `prefix`.
    pub fn feed_url(&self, prefix: &str) -> String {
        format!(
            "{}{}{}",
            self.search_url,
            urlencoding::encode(prefix),
            self.search_params
        )
    }
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Identifier of the created item.
    pub item_id: String,
    /// URL the file was stored at.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> ArchiveFeed {
        ArchiveFeed {
            item_prefix: "youtube-audio-".to_string(),
            search_url: "https://archive.org/advancedsearch.php?q=".to_string(),
            search_params: "&rows=100&output=rss".to_string(),
        }
    }

    #[test]
    fn test_item_prefix_for_chat() {
        assert_eq!(feed().item_prefix_for(42), "youtube-audio-42-");
        assert_eq!(feed().item_prefix_for(-1001), "youtube-audio--1001-");
    }

    #[test]
    fn test_feed_url() {
        let feed = feed();
        let url = feed.feed_url(&feed.item_prefix_for(42));
        assert_eq!(
            url,
            "https://archive.org/advancedsearch.php?q=youtube-audio-42-&rows=100&output=rss"
        );
    }

    #[test]
    fn test_feed_url_encodes_prefix() {
        let url = feed().feed_url("my prefix*");
        assert!(url.contains("my%20prefix%2A"));
    }
}
