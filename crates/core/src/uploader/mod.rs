//! Uploader module for archiving extracted audio.
//!
//! Uploaded items share a per-requester prefix so that an archive.org
//! search over that prefix doubles as a podcast feed.

mod archive;
mod config;
mod error;
mod traits;
mod types;

pub use archive::ArchiveUploader;
pub use config::ArchiveConfig;
pub use error::UploadError;
pub use traits::Uploader;
pub use types::{ArchiveFeed, UploadReceipt};
