//! # Hapic Telemetry
//!
//! Structured logging for Hapic services.
//!
//! Every Hapic crate logs through [`tracing`]: controller registration and
//! pipeline stages at `debug`, output validation failures and stream
//! truncation at `warn`, documentation generation at `info`. This crate
//! installs a `tracing-subscriber` formatter for those events, either JSON
//! lines (production) or a human-readable layout (development).
//!
//! ```rust,ignore
//! use hapic_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(controller = "get_user", "ready");
//! ```

#![doc(html_root_url = "https://docs.rs/hapic-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
