use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Telegram token is present
/// - Every stage has at least one worker
/// - Server port is not 0
/// - Segment duration is `HH:MM:SS`
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.telegram.token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "telegram.token is required (or set TELEGRAM_BOT_TOKEN)".to_string(),
        ));
    }

    let pipeline = &config.pipeline;
    for (name, count) in [
        ("fetch_workers", pipeline.fetch_workers),
        ("transcode_workers", pipeline.transcode_workers),
        ("publish_workers", pipeline.publish_workers),
    ] {
        if count == 0 {
            return Err(ConfigError::ValidationError(format!(
                "pipeline.{} cannot be 0",
                name
            )));
        }
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if !is_clock_duration(&config.converter.segment_time) {
        return Err(ConfigError::ValidationError(format!(
            "converter.segment_time must be HH:MM:SS, got {:?}",
            config.converter.segment_time
        )));
    }

    Ok(())
}

fn is_clock_duration(value: &str) -> bool {
    let parts: Vec<&str> = value.split(':').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.bytes().all(|b| b.is_ascii_digit()))
        && parts[1] < "60"
        && parts[2] < "60"
}
