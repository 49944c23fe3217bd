pub mod config;
pub mod converter;
pub mod downloader;
pub mod media;
pub mod messaging;
pub mod metrics;
pub mod pipeline;
pub mod testing;
pub mod uploader;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use converter::{Converter, ConverterConfig, ConverterError, FfmpegConverter};
pub use downloader::{Downloader, DownloaderConfig, DownloaderError, YtDlpDownloader};
pub use media::MediaPaths;
pub use messaging::{InboundMessage, MessageHandle, MessagingError, MessagingSink, TelegramClient};
pub use pipeline::{
    Collaborators, PipelineConfig, PipelineDispatcher, PipelineError, PipelineStatus, Stage,
    TaskEvent,
};
pub use uploader::{ArchiveConfig, ArchiveUploader, UploadError, Uploader};
