//! Builders for error response bodies.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::ProcessValidationError;
use crate::schema::{Field, Schema};

/// Builds the body of error responses.
///
/// The schema is referenced by documented error responses.
pub trait ErrorBuilder: Send + Sync + fmt::Debug {
    /// Body for a handler error matched by the error table.
    fn build_from_error(&self, error: &anyhow::Error) -> Value;

    /// Body for an input or output validation failure.
    fn build_from_validation_error(&self, error: &ProcessValidationError) -> Value;

    /// Schema describing the bodies this builder produces.
    fn schema(&self) -> Arc<Schema>;
}

/// Produces `{"message": ..., "details": {...}}` bodies.
#[derive(Debug, Clone)]
pub struct DefaultErrorBuilder {
    schema: Arc<Schema>,
}

impl DefaultErrorBuilder {
    /// Creates the default builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: Schema::builder("DefaultErrorSchema")
                .field("message", Field::string().required())
                .field("details", Field::any().missing(json!({})))
                .build(),
        }
    }
}

impl Default for DefaultErrorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorBuilder for DefaultErrorBuilder {
    fn build_from_error(&self, error: &anyhow::Error) -> Value {
        json!({"message": error.to_string(), "details": {}})
    }

    fn build_from_validation_error(&self, error: &ProcessValidationError) -> Value {
        json!({"message": error.message, "details": error.details})
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ErrorDetails;

    #[test]
    fn test_build_from_error() {
        let builder = DefaultErrorBuilder::new();
        let body = builder.build_from_error(&anyhow::anyhow!("user not found"));
        assert_eq!(body, json!({"message": "user not found", "details": {}}));
        assert!(builder.schema().load(&body).is_ok());
    }

    #[test]
    fn test_build_from_validation_error() {
        let mut details = ErrorDetails::new();
        details.insert("i".to_string(), vec!["Not a valid integer.".to_string()]);
        let body = DefaultErrorBuilder::new()
            .build_from_validation_error(&ProcessValidationError::input(details));
        assert_eq!(
            body,
            json!({
                "message": "Validation error of input data",
                "details": {"i": ["Not a valid integer."]}
            })
        );
    }

    #[test]
    fn test_schema_name() {
        assert_eq!(DefaultErrorBuilder::new().schema().name(), "DefaultErrorSchema");
    }
}
