//! Request reading errors.

use std::fmt;

use hapic_core::HapicError;
use thiserror::Error;

/// Part of the request that could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    /// Query string
    Query,
    /// Request headers
    Header,
    /// Request body
    Body,
    /// Multipart form data
    Multipart,
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Header => write!(f, "header"),
            Self::Body => write!(f, "body"),
            Self::Multipart => write!(f, "multipart"),
        }
    }
}

/// Errors raised while reading an HTTP request.
///
/// Converted into [`HapicError::RequestParameters`] at the context boundary,
/// which the pipeline answers with a `400` validation error response.
#[derive(Error, Debug)]
pub enum HttpError {
    /// The request could not be decoded.
    #[error("invalid {source_kind}: {message}")]
    Malformed {
        /// Where the problem is.
        source_kind: RequestSource,
        /// What went wrong.
        message: String,
    },

    /// The body exceeds the configured limit.
    #[error("payload too large: {actual} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Configured limit.
        limit: usize,
        /// Received size.
        actual: usize,
    },

    /// The body stream failed.
    #[error("failed to read request body: {0}")]
    Body(String),
}

impl HttpError {
    /// Creates a malformed-request error.
    #[must_use]
    pub fn malformed(source_kind: RequestSource, message: impl Into<String>) -> Self {
        Self::Malformed {
            source_kind,
            message: message.into(),
        }
    }

    /// Creates a payload-too-large error.
    #[must_use]
    pub fn payload_too_large(limit: usize, actual: usize) -> Self {
        Self::PayloadTooLarge { limit, actual }
    }
}

impl From<HttpError> for HapicError {
    fn from(err: HttpError) -> Self {
        Self::request_parameters(err.to_string())
    }
}

/// Result type for request reading.
pub type HttpResult<T> = Result<T, HttpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = HttpError::malformed(RequestSource::Query, "bad escape");
        assert_eq!(err.to_string(), "invalid query: bad escape");

        let err = HttpError::payload_too_large(10, 20);
        assert!(err.to_string().contains("20 bytes"));
    }

    #[test]
    fn test_into_hapic_error() {
        let err: HapicError = HttpError::malformed(RequestSource::Multipart, "no boundary").into();
        assert!(matches!(err, HapicError::RequestParameters { .. }));
        assert!(err.to_string().contains("no boundary"));
    }
}
