//! Errors raised while loading or validating a `HapicConfig`.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file passed to `with_file` does not exist.
    #[error("hapic configuration file {path} does not exist")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The file exists but reading it failed.
    #[error("cannot read hapic configuration file {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document does not match the configuration sections.
    #[error("invalid TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The JSON document does not match the configuration sections.
    #[error("invalid JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported file extension or format name.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// A section value failed validation.
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted path of the value, e.g. `doc.base_path`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An override variable could not be applied.
    #[error("cannot apply environment override {var}: {reason}")]
    EnvParseError {
        /// Variable name.
        var: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The `.env` file exists but could not be loaded.
    #[error("cannot load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

impl ConfigError {
    /// Missing file.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Unreadable file.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Value rejected by validation.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Rejected environment override.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_error() {
        let err = ConfigError::file_not_found("/path/to/hapic.toml");
        assert!(err.to_string().contains("/path/to/hapic.toml"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("doc.base_path", "must start with '/'");
        assert!(err.to_string().contains("doc.base_path"));
        assert!(err.to_string().contains("must start with '/'"));
    }

    #[test]
    fn test_env_parse_error() {
        let err = ConfigError::env_parse_error("HAPIC__PROCESSING__MODE", "expected 'blocking'");
        assert!(err.to_string().contains("HAPIC__PROCESSING__MODE"));
        assert!(err.to_string().contains("expected 'blocking'"));
    }

    #[test]
    fn test_unsupported_format() {
        let err = ConfigError::UnsupportedFormat("yaml".to_string());
        assert!(err.to_string().contains("yaml"));
    }
}
