//! Configuration schema types.
//!
//! This module defines the structure of every configuration section.

use hapic_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// How decorated handlers are invoked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Plain calls; streamed output is a blocking iterator.
    Blocking,
    /// Handlers are awaited; streamed output is an async stream.
    #[default]
    Cooperative,
}

/// Documentation section: the `info` block and server location of the
/// generated OpenAPI document.
///
/// # Example
///
/// ```
/// use hapic_config::DocConfig;
///
/// let config = DocConfig {
///     title: "User API".to_string(),
///     base_path: Some("/api".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(config.version, "1.0.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocConfig {
    /// API title.
    #[serde(default = "default_title")]
    pub title: String,

    /// API description.
    #[serde(default)]
    pub description: Option<String>,

    /// API version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Host serving the API (e.g., "api.example.com").
    #[serde(default)]
    pub host: Option<String>,

    /// Base path of every route (e.g., "/api").
    #[serde(default)]
    pub base_path: Option<String>,

    /// Transfer protocols.
    #[serde(default)]
    pub schemes: Vec<String>,
}

impl Default for DocConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: None,
            version: default_version(),
            host: None,
            base_path: None,
            schemes: Vec::new(),
        }
    }
}

fn default_title() -> String {
    "API Documentation".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Processing section: defaults applied when decorating controllers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Execution mode of the `Hapic` instance.
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Status of input validation errors when a decorator sets none.
    #[serde(default = "default_error_http_code")]
    pub default_error_http_code: u16,

    /// Status of successful responses when an output decorator sets none.
    #[serde(default = "default_output_http_code")]
    pub default_output_http_code: u16,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            default_error_http_code: default_error_http_code(),
            default_output_http_code: default_output_http_code(),
        }
    }
}

fn default_error_http_code() -> u16 {
    400
}

fn default_output_http_code() -> u16 {
    200
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level or filter directives.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts the section into the settings consumed by
    /// [`hapic_telemetry::init_logging`].
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            ansi: self.ansi_enabled,
            file_line_info: self.include_location,
            ..LogConfig::default()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
