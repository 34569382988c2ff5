//! Main configuration types.
//!
//! This module provides the top-level [`HapicConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DocConfig, ExecutionMode, LoggingConfig, ProcessingConfig};

const KNOWN_SCHEMES: [&str; 4] = ["http", "https", "ws", "wss"];

/// Complete Hapic configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hapic_config::HapicConfig;
///
/// let config = HapicConfig::default();
/// assert_eq!(config.processing.default_error_http_code, 400);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HapicConfig {
    /// Documentation settings.
    #[serde(default)]
    pub doc: DocConfig,

    /// Decoration defaults and execution mode.
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HapicConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> HapicConfigBuilder {
        HapicConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - A default status code is outside 100..=599
    /// - The base path does not start with `/`
    /// - A scheme is not one of http, https, ws, wss
    /// - The title is empty
    /// - The log level does not parse as a filter
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, code) in [
            (
                "processing.default_error_http_code",
                self.processing.default_error_http_code,
            ),
            (
                "processing.default_output_http_code",
                self.processing.default_output_http_code,
            ),
        ] {
            if !(100..=599).contains(&code) {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("{code} is not an HTTP status code"),
                ));
            }
        }

        if self.doc.title.trim().is_empty() {
            return Err(ConfigError::invalid_value("doc.title", "must not be empty"));
        }

        if let Some(base_path) = &self.doc.base_path {
            if !base_path.starts_with('/') {
                return Err(ConfigError::invalid_value(
                    "doc.base_path",
                    format!("must start with '/': {base_path}"),
                ));
            }
        }

        if let Some(scheme) = self
            .doc
            .schemes
            .iter()
            .find(|s| !KNOWN_SCHEMES.contains(&s.as_str()))
        {
            return Err(ConfigError::invalid_value(
                "doc.schemes",
                format!("unknown scheme: {scheme}"),
            ));
        }

        if self.logging.enabled {
            hapic_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Development preset: pretty debug logs with source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: hapic_telemetry::LogFormat::Pretty,
                ansi_enabled: true,
                include_location: true,
                ..LoggingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production preset: JSON logs at info level.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Builder for [`HapicConfig`].
#[derive(Debug, Default)]
pub struct HapicConfigBuilder {
    config: HapicConfig,
}

impl HapicConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the documentation section.
    #[must_use]
    pub fn doc(mut self, doc: DocConfig) -> Self {
        self.config.doc = doc;
        self
    }

    /// Set the processing section.
    #[must_use]
    pub fn processing(mut self, processing: ProcessingConfig) -> Self {
        self.config.processing = processing;
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Set the execution mode.
    #[must_use]
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.config.processing.mode = mode;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> HapicConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(HapicConfig::default().validate().is_ok());
        assert!(HapicConfig::development().validate().is_ok());
        assert!(HapicConfig::production().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = HapicConfig::builder()
            .mode(ExecutionMode::Blocking)
            .doc(DocConfig {
                title: "Users".to_string(),
                ..Default::default()
            })
            .build();
        assert_eq!(config.processing.mode, ExecutionMode::Blocking);
        assert_eq!(config.doc.title, "Users");
    }

    #[test]
    fn test_invalid_status_code() {
        let mut config = HapicConfig::default();
        config.processing.default_error_http_code = 42;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_error_http_code"));
    }

    #[test]
    fn test_invalid_base_path() {
        let mut config = HapicConfig::default();
        config.doc.base_path = Some("api".to_string());
        assert!(config.validate().is_err());
        config.doc.base_path = Some("/api".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_scheme() {
        let mut config = HapicConfig::default();
        config.doc.schemes = vec!["https".to_string(), "gopher".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gopher"));
    }

    #[test]
    fn test_invalid_log_level_only_checked_when_enabled() {
        let mut config = HapicConfig::default();
        config.logging.level = "hapic=loud".to_string();
        assert!(config.validate().is_err());
        config.logging.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_preset() {
        let config = HapicConfig::development();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, hapic_telemetry::LogFormat::Pretty);
    }
}
