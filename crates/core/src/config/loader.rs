use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for nested environment overrides, e.g. `TUBECAST_PIPELINE__FETCH_WORKERS=3`.
const ENV_PREFIX: &str = "TUBECAST_";

/// Bot token variable honoured without prefix.
const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Archive credentials variable honoured without prefix.
const ARCHIVE_AUTH_ENV: &str = "ARCHIVE_AUTH_STRING";

/// Environment providers layered on top of defaults and the optional file.
fn with_env(figment: Figment) -> Figment {
    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(
            Env::raw()
                .only(&[TELEGRAM_TOKEN_ENV])
                .map(|_| "telegram.token".into()),
        )
        .merge(
            Env::raw()
                .only(&[ARCHIVE_AUTH_ENV])
                .map(|_| "archive.auth_string".into()),
        )
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(path));

    with_env(figment)
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from defaults and environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    with_env(Figment::from(Serialized::defaults(Config::default())))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
