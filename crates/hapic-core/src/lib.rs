//! # Hapic Core
//!
//! Core types and traits for Hapic.
//!
//! This crate provides the framework-agnostic building blocks used by the
//! pipeline and the documentation generator:
//!
//! - [`Schema`] - Named field-level contract with load/dump semantics
//! - [`Processor`] - Validation backend bound to one schema
//! - [`RequestParameters`] / [`HapicData`] - Raw and validated request data
//! - [`HapicFile`] - File output payload
//! - [`ControllerDescription`] - Decorators declared on one controller
//! - [`ExceptionMapper`] - Error-to-status table
//! - [`Context`] - Framework adapter contract
//! - [`HapicError`] / [`ProcessError`] - Standard error types

#![doc(html_root_url = "https://docs.rs/hapic-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod data;
pub mod description;
mod error;
mod error_builder;
pub mod exception;
mod processor;
pub mod schema;

pub use context::{ChunkIter, Context};
pub use data::{HapicData, HapicFile, RequestParameters, UploadedFile};
pub use description::{
    ApiDoc, ControllerDescription, ControllerRegistry, ControllerToken, DecoratedController,
    InputDescription, InputSlice, OutputBodyDescription, OutputFileDescription,
    OutputStreamDescription, RouteRepresentation,
};
pub use error::{
    HapicError, HapicResult, ProcessError, ProcessValidationError, INPUT_VALIDATION_MESSAGE,
    OUTPUT_VALIDATION_MESSAGE,
};
pub use error_builder::{DefaultErrorBuilder, ErrorBuilder};
pub use exception::{ErrorMapping, ErrorMatcher, ExceptionMapper};
pub use processor::{default_processor_factory, Processor, ProcessorFactory, SchemaProcessor};
pub use schema::{ErrorDetails, Field, FieldKind, Schema};
