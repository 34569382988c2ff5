//! Error types for Hapic.
//!
//! Two families of errors exist:
//!
//! - [`ProcessError`] - raised by a [`Processor`](crate::Processor) while
//!   loading input, dumping output or checking a file payload
//! - [`HapicError`] - raised by the pipeline, the context adapter and the
//!   documentation generator
//!
//! Validation failures carry a [`ProcessValidationError`], which is also the
//! wire shape of validation error responses:
//!
//! ```json
//! {"message": "Validation error of input data", "details": {"i": ["Not a valid integer."]}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::ErrorDetails;

/// Result type alias using [`HapicError`].
pub type HapicResult<T> = Result<T, HapicError>;

/// Message used for input validation failures.
pub const INPUT_VALIDATION_MESSAGE: &str = "Validation error of input data";

/// Message used for output validation failures.
pub const OUTPUT_VALIDATION_MESSAGE: &str = "Validation error of output data";

/// A structured validation failure: a message plus per-field details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessValidationError {
    /// Human-readable summary.
    pub message: String,
    /// Field path to the messages reported for it.
    pub details: ErrorDetails,
}

impl ProcessValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>, details: ErrorDetails) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }

    /// Creates an input validation error with the standard message.
    #[must_use]
    pub fn input(details: ErrorDetails) -> Self {
        Self::new(INPUT_VALIDATION_MESSAGE, details)
    }

    /// Creates an output validation error with the standard message.
    #[must_use]
    pub fn output(details: ErrorDetails) -> Self {
        Self::new(OUTPUT_VALIDATION_MESSAGE, details)
    }
}

impl fmt::Display for ProcessValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for (path, messages) in &self.details {
            write!(f, "; {}: {}", path, messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ProcessValidationError {}

/// Errors raised by a [`Processor`](crate::Processor).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Request data failed field-level validation.
    #[error("{0}")]
    InputValidation(ProcessValidationError),

    /// Request data is not a mapping-like structure at all.
    #[error("invalid input type: expected {expected}, got {found}")]
    WrongInputShape {
        /// What the schema expected.
        expected: &'static str,
        /// The JSON type that was received.
        found: &'static str,
    },

    /// A handler returned data that violates its output schema.
    #[error("{0}")]
    OutputValidation(ProcessValidationError),

    /// A file payload violates the [`HapicFile`](crate::HapicFile) invariants.
    #[error("invalid file output: {reason}")]
    InvalidFile {
        /// Why the file was rejected.
        reason: String,
    },
}

impl ProcessError {
    /// Creates an invalid-file error.
    #[must_use]
    pub fn invalid_file(reason: impl Into<String>) -> Self {
        Self::InvalidFile {
            reason: reason.into(),
        }
    }

    /// Returns true for failures caused by the handler rather than the caller.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::OutputValidation(_) | Self::InvalidFile { .. })
    }
}

/// Errors raised by the pipeline, context adapters and doc generation.
#[derive(Error, Debug)]
pub enum HapicError {
    /// A decorated controller has no route in the framework's route table.
    #[error("no route found for controller '{controller}'")]
    RouteNotFound {
        /// Name of the controller that could not be located.
        controller: String,
    },

    /// The framework has no routes registered at all.
    #[error("no routes registered in the framework")]
    NoRoutes,

    /// A request was handled before a context adapter was set.
    #[error("context adapter is not set")]
    ContextNotSet,

    /// `set_context` was called twice.
    #[error("context adapter is already set")]
    ContextAlreadySet,

    /// Invalid decoration or builder configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// The context adapter could not read the request.
    #[error("cannot read request parameters: {message}")]
    RequestParameters {
        /// Description of the problem.
        message: String,
    },

    /// A processor failure that escaped the pipeline's error responses.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// A handler error with no matching `handle_exception` entry.
    #[error("handler error: {0}")]
    Handler(#[source] anyhow::Error),
}

impl HapicError {
    /// Creates a route-not-found error.
    #[must_use]
    pub fn route_not_found(controller: impl Into<String>) -> Self {
        Self::RouteNotFound {
            controller: controller.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a request-parameters error.
    #[must_use]
    pub fn request_parameters(message: impl Into<String>) -> Self {
        Self::RequestParameters {
            message: message.into(),
        }
    }

    /// Returns true for errors that can only happen during doc generation.
    #[must_use]
    pub fn is_doc_error(&self) -> bool {
        matches!(self, Self::RouteNotFound { .. } | Self::NoRoutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(path: &str, message: &str) -> ErrorDetails {
        let mut details = ErrorDetails::new();
        details.insert(path.to_string(), vec![message.to_string()]);
        details
    }

    #[test]
    fn test_validation_error_serialization() {
        let error = ProcessValidationError::input(details("i", "Not a valid integer."));
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "Validation error of input data",
                "details": {"i": ["Not a valid integer."]}
            })
        );
    }

    #[test]
    fn test_validation_error_display() {
        let error = ProcessValidationError::output(details("i", "Missing data for required field."));
        assert_eq!(
            error.to_string(),
            "Validation error of output data; i: Missing data for required field."
        );
    }

    #[test]
    fn test_process_error_kinds() {
        assert!(ProcessError::invalid_file("nope").is_server_error());
        assert!(ProcessError::OutputValidation(ProcessValidationError::output(ErrorDetails::new()))
            .is_server_error());
        assert!(!ProcessError::WrongInputShape {
            expected: "object",
            found: "string"
        }
        .is_server_error());
    }

    #[test]
    fn test_hapic_error_display() {
        let err = HapicError::route_not_found("get_user");
        assert_eq!(err.to_string(), "no route found for controller 'get_user'");
        assert!(err.is_doc_error());
        assert!(HapicError::NoRoutes.is_doc_error());
        assert!(!HapicError::ContextNotSet.is_doc_error());
    }

    #[test]
    fn test_process_error_converts() {
        let err: HapicError = ProcessError::invalid_file("missing path").into();
        assert!(matches!(err, HapicError::Process(_)));
        assert_eq!(err.to_string(), "invalid file output: missing path");
    }
}
