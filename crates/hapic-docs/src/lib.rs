//! # Hapic Docs
//!
//! OpenAPI 2.0 (Swagger) generation from decorated controllers.
//!
//! The generator walks the controller registry, asks the framework's
//! [`Context`](hapic_core::Context) where each controller is mounted, and
//! builds one operation per route:
//!
//! - **Definitions**: one per distinct schema name used by bodies, forms,
//!   outputs and error responses (nested schemas included)
//! - **Parameters**: path, query, header and form fields typed from the
//!   schema, plus a `body` parameter referencing the input body definition
//! - **Responses**: keyed by status code; streams are arrays of the item
//!   definition, files are `type: file`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hapic_docs::DocGenerator;
//!
//! let doc = DocGenerator::new()
//!     .title("User API")
//!     .version("1.0.0")
//!     .generate(&registry.controllers(), &context, &error_builder.schema())?;
//! println!("{}", serde_json::to_string_pretty(&doc)?);
//! ```

#![doc(html_root_url = "https://docs.rs/hapic-docs/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod openapi;

pub use error::{DocsError, DocsResult};
pub use openapi::{
    Contact, DocGenerator, Info, License, OpenApi, Operation, Parameter, ParameterIn, PathItem,
    Response, Tag,
};
