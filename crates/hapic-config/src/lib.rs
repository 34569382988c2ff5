//! Typed configuration for Hapic.
//!
//! Configuration is layered, later layers overriding earlier ones:
//! defaults → TOML/JSON file → `HAPIC__*` environment variables. A `.env`
//! file can feed the environment layer. Unknown fields are rejected and the
//! final configuration is validated.
//!
//! - [`DocConfig`] - OpenAPI `info` block, host, base path, schemes
//! - [`ProcessingConfig`] - execution mode and default status codes
//! - [`LoggingConfig`] - log level and format
//!
//! # Example
//!
//! ```no_run
//! use hapic_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hapic_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("hapic.toml")?
//!     .with_env_prefix("HAPIC")
//!     .load()?;
//!
//! println!("documenting {}", config.doc.title);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [doc]
//! title = "User API"
//! version = "2.0.0"
//! base_path = "/api"
//! schemes = ["https"]
//!
//! [processing]
//! mode = "cooperative"
//! default_error_http_code = 400
//! default_output_http_code = 200
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `HAPIC__DOC__TITLE=Users`
//! - `HAPIC__PROCESSING__MODE=blocking`
//! - `HAPIC__LOGGING__LEVEL=hapic_pipeline=debug,info`

#![doc(html_root_url = "https://docs.rs/hapic-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{HapicConfig, HapicConfigBuilder};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{DocConfig, ExecutionMode, LoggingConfig, ProcessingConfig};
