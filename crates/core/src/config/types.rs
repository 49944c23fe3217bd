use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::converter::ConverterConfig;
use crate::downloader::DownloaderConfig;
use crate::pipeline::PipelineConfig;
use crate::uploader::ArchiveConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Pipeline settings with the archival toggle resolved from the archive section.
    ///
    /// Archival is enabled exactly when an archive auth string is configured.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let feed = self.archive.is_enabled().then(|| self.archive.feed());
        self.pipeline.clone().with_archive(feed)
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Bot token from BotFather
    #[serde(default)]
    pub token: String,
    /// Bot API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Long-poll timeout in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    10
}

/// Ops HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub telegram: SanitizedTelegramConfig,
    pub pipeline: PipelineConfig,
    pub archive: SanitizedArchiveConfig,
    pub downloader: DownloaderConfig,
    pub converter: ConverterConfig,
    pub server: ServerConfig,
}

/// Sanitized Telegram config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelegramConfig {
    pub api_url: String,
    pub token_configured: bool,
    pub poll_timeout_secs: u64,
}

/// Sanitized archive config (auth string hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedArchiveConfig {
    pub enabled: bool,
    pub base_url: String,
    pub item_prefix: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            telegram: SanitizedTelegramConfig {
                api_url: config.telegram.api_url.clone(),
                token_configured: !config.telegram.token.is_empty(),
                poll_timeout_secs: config.telegram.poll_timeout_secs,
            },
            pipeline: config.pipeline_config(),
            archive: SanitizedArchiveConfig {
                enabled: config.archive.is_enabled(),
                base_url: config.archive.base_url.clone(),
                item_prefix: config.archive.item_prefix.clone(),
            },
            downloader: config.downloader.clone(),
            converter: config.converter.clone(),
            server: config.server.clone(),
        }
    }
}
