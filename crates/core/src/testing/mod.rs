//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every collaborator trait the
//! pipeline drives, so the whole pipeline can be exercised without yt-dlp,
//! ffmpeg, archive.org or Telegram.
//!
//! # Example
//!
//! ```rust,ignore
//! use tubecast_core::testing::{MockConverter, MockDownloader, MockMessaging};
//!
//! let paths = MediaPaths::new(dir.path());
//! let downloader = Arc::new(MockDownloader::new(paths.clone()));
//! let converter = Arc::new(MockConverter::new(paths));
//! converter.set_segment_count(3).await;
//! ```

mod mock_converter;
mod mock_downloader;
mod mock_messaging;
mod mock_uploader;
mod probe;

pub use mock_converter::MockConverter;
pub use mock_downloader::MockDownloader;
pub use mock_messaging::{MessagingOp, MockMessaging, FIRST_MESSAGE_ID};
pub use mock_uploader::{MockUploader, RecordedUpload};
pub use probe::{ConcurrencyProbe, ProbeGuard};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::messaging::{InboundMessage, MessageHandle, Requester};
    use crate::uploader::ArchiveFeed;

    /// Chat ID used by fixtures.
    pub const CHAT_ID: i64 = 42;

    /// An inbound chat message from the fixture requester.
    pub fn inbound(text: &str) -> InboundMessage {
        inbound_with_id(text, 1)
    }

    /// Like [`inbound`], with an explicit message ID.
    pub fn inbound_with_id(text: &str, message_id: i64) -> InboundMessage {
        InboundMessage {
            requester: Requester {
                chat_id: CHAT_ID,
                first_name: "Ada".to_string(),
            },
            text: text.to_string(),
            message: MessageHandle::new(CHAT_ID, message_id, text),
        }
    }

    /// Archive feed with the default naming.
    pub fn archive_feed() -> ArchiveFeed {
        ArchiveFeed {
            item_prefix: "youtube-audio-".to_string(),
            search_url: "https://archive.org/advancedsearch.php?q=".to_string(),
            search_params: "&rows=100&page=1&callback=callback&save=yes&output=rss".to_string(),
        }
    }
}
