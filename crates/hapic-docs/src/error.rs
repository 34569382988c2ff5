//! Error types for the documentation generation crate.

use hapic_core::HapicError;
use thiserror::Error;

/// Errors that can occur during documentation generation.
#[derive(Debug, Error)]
pub enum DocsError {
    /// Failed to serialize the OpenAPI document to JSON.
    #[error("Failed to serialize OpenAPI spec: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The context adapter could not locate a controller's route.
    #[error("Route lookup failed: {0}")]
    RouteError(#[from] HapicError),

    /// A route cannot be expressed as an OpenAPI operation.
    #[error("Invalid operation '{operation_id}': {reason}")]
    InvalidOperation {
        /// The controller name.
        operation_id: String,
        /// The reason the operation is invalid.
        reason: String,
    },
}

impl DocsError {
    /// Returns true if a controller could not be located in the route table.
    #[must_use]
    pub fn is_route_not_found(&self) -> bool {
        matches!(self, Self::RouteError(HapicError::RouteNotFound { .. }))
    }

    /// Returns true if the framework has no routes at all.
    #[must_use]
    pub fn is_no_routes(&self) -> bool {
        matches!(self, Self::RouteError(HapicError::NoRoutes))
    }
}

/// Result type for documentation operations.
pub type DocsResult<T> = Result<T, DocsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error() {
        let err: DocsError = serde_json::from_str::<String>("invalid")
            .unwrap_err()
            .into();
        assert!(matches!(err, DocsError::SerializationError(_)));
        assert!(err.to_string().contains("serialize"));
    }

    #[test]
    fn test_route_errors() {
        let err: DocsError = HapicError::route_not_found("get_user").into();
        assert!(err.is_route_not_found());
        assert!(!err.is_no_routes());
        assert!(err.to_string().contains("get_user"));

        let err: DocsError = HapicError::NoRoutes.into();
        assert!(err.is_no_routes());
    }

    #[test]
    fn test_invalid_operation_error() {
        let err = DocsError::InvalidOperation {
            operation_id: "getUser".to_string(),
            reason: "unknown HTTP method: BREW".to_string(),
        };
        assert!(err.to_string().contains("getUser"));
        assert!(err.to_string().contains("BREW"));
    }
}
