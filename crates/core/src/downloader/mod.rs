//! Downloader module for fetching remote media.
//!
//! Provides the `Downloader` trait consumed by the fetch stage and a
//! yt-dlp backed implementation that writes `<temp>/<id>.mp4` plus an
//! optional resized thumbnail.

mod config;
mod error;
mod traits;
mod types;
mod ytdlp;

pub use config::DownloaderConfig;
pub use error::DownloaderError;
pub use traits::Downloader;
pub use types::{FetchedMedia, RemoteMediaInfo};
pub use ytdlp::{is_valid_media_id, YtDlpDownloader};
