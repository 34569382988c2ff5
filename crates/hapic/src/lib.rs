//! # Hapic
//!
//! **Input/output validation and OpenAPI documentation for HTTP handlers,
//! independent of the web framework running them.**
//!
//! Hapic wraps a handler in an ordered pipeline:
//!
//! - **Input stages** validate the path, query, headers, body, form fields
//!   and uploaded files against schemas, answering with a structured error
//!   response before the handler runs
//! - **Output stages** serialize and check the returned body, stream items
//!   as newline-delimited JSON, or send files
//! - **Error mapping** turns application errors into status codes
//! - **Documentation** is generated as an OpenAPI 2.0 document from the
//!   same declarations
//!
//! The framework is reached through a [`Context`](core::Context) adapter;
//! [`http::HttpContext`] is the adapter shipped with the crate.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hapic::prelude::*;
//!
//! let hapic = Hapic::<HttpContext>::new(ExecutionMode::Cooperative);
//! let hello = hapic
//!     .controller("hello")
//!     .input_query(
//!         Schema::builder("HelloQuerySchema")
//!             .field("name", Field::string().required())
//!             .build(),
//!     )
//!     .output_body(
//!         Schema::builder("GreetingSchema")
//!             .field("message", Field::string().required())
//!             .build(),
//!     )
//!     .async_handler(|_request, data| async move {
//!         Ok(Reply::from(json!({"message": format!("Hello {}", data.query["name"])})))
//!     })?;
//!
//! let mut router = HttpRouter::new();
//! router.route(Method::GET, "/hello", &hello);
//! hapic.set_context(router.context())?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! request → path → query → headers → body → forms → files → handler
//!                                                             ↓
//! response ← Context ← output_body | output_stream | output_file
//! ```

#![doc(html_root_url = "https://docs.rs/hapic/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use hapic_core as core;

// Re-export the decoration engine
pub use hapic_pipeline as pipeline;

// Re-export doc generation
pub use hapic_docs as docs;

// Re-export the HTTP adapter
pub use hapic_http as http;

// Re-export configuration
pub use hapic_config as config;

// Re-export logging setup
pub use hapic_telemetry as telemetry;

mod setup;

pub use setup::{init_logging, load_config, SetupError, DEFAULT_CONFIG_FILE};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use hapic::prelude::*;
/// ```
pub mod prelude {
    pub use hapic_core::{
        ApiDoc, Context, ErrorMapping, ErrorMatcher, Field, HapicData, HapicError, HapicFile,
        HapicResult, Schema, UploadedFile,
    };

    pub use hapic_pipeline::{
        Controller, ExecutionMode, Hapic, HandlerResult, InputOptions, OutputOptions, Reply,
    };

    pub use hapic_docs::{DocGenerator, OpenApi};

    pub use hapic_http::{HttpContext, HttpRequest, HttpResponse, HttpRouter};

    pub use hapic_config::{ConfigLoader, HapicConfig};
}
