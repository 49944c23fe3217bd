//! Converter module for transcoding fetched media.
//!
//! This module provides the `Converter` trait and an FFmpeg implementation
//! that extracts the audio track of a fetched file and splits it into
//! segments of bounded duration.
//!
//! # Example
//!
//! ```ignore
//! use tubecast_core::converter::{Converter, ConverterConfig, FfmpegConverter};
//! use tubecast_core::media::MediaPaths;
//!
//! let converter = FfmpegConverter::new(ConverterConfig::default(), MediaPaths::new("./tmp/"));
//! let result = converter.transcode("dQw4w9WgXcQ").await?;
//! for segment in &result.segments {
//!     println!("{} -> {}", segment.label(), segment.path.display());
//! }
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use traits::Converter;
pub use types::TranscodeResult;
