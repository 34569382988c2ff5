//! # Hapic Pipeline
//!
//! The decoration engine of Hapic.
//!
//! A [`Hapic`] instance is bound to one framework adapter (a
//! [`Context`](hapic_core::Context)) and one [`ExecutionMode`]. Controllers
//! are declared with a [`ControllerBuilder`] and finalized around a handler:
//!
//! ```text
//! request → input_path → input_query → input_headers → input_body
//!         → input_forms → input_files → handler
//!                                          ↓
//! response ← output_body | output_stream | output_file ← error table
//! ```
//!
//! Input failures short-circuit with a validation error response, handler
//! errors are matched against the controller's error table, and outputs
//! are dumped through their schema before the adapter builds the response.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hapic_pipeline::{ExecutionMode, Hapic, Reply};
//!
//! let hapic = Hapic::<MyContext>::new(ExecutionMode::Blocking);
//! let hello = hapic
//!     .controller("hello")
//!     .input_query(name_schema)
//!     .output_body(greeting_schema)
//!     .handler(|_request, data| Ok(Reply::from(data.query)))?;
//!
//! hapic.set_context(MyContext::new())?;
//! let response = hello.call_blocking(request)?;
//! ```

#![doc(html_root_url = "https://docs.rs/hapic-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod controller;
mod hapic;
mod reply;
mod stream;

pub use controller::{
    BoxFuture, Controller, ControllerBuilder, HandlerResult, InputOptions, OutputOptions,
};
pub use hapic::{Hapic, HapicBuilder};
pub use hapic_config::ExecutionMode;
pub use reply::Reply;
