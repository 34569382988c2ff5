//! Application setup: configuration loading and logging.

use hapic_config::{ConfigError, ConfigLoader, HapicConfig, DEFAULT_ENV_PREFIX};
use hapic_telemetry::TelemetryError;
use thiserror::Error;

/// Configuration file read by [`load_config`] when present.
pub const DEFAULT_CONFIG_FILE: &str = "hapic.toml";

/// Errors raised while setting up an application.
#[derive(Error, Debug)]
pub enum SetupError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Loads configuration from `.env`, an optional [`DEFAULT_CONFIG_FILE`]
/// and `HAPIC__*` environment variables, in that order of precedence
/// (environment last).
pub fn load_config() -> Result<HapicConfig, SetupError> {
    let config = ConfigLoader::new()
        .with_dotenv()?
        .with_optional_file(DEFAULT_CONFIG_FILE)?
        .with_env_prefix(DEFAULT_ENV_PREFIX)
        .load()?;
    Ok(config)
}

/// Installs the global log subscriber described by `config.logging`.
pub fn init_logging(config: &HapicConfig) -> Result<(), SetupError> {
    hapic_telemetry::init_logging(&config.logging.to_log_config())?;
    Ok(())
}
