//! Declarative mapping of handler errors to HTTP responses.
//!
//! Each controller carries an [`ExceptionMapper`]: an ordered table of
//! [`ErrorMapping`] entries populated by `handle_exception` decorators.
//! Lookup prefers an exact type match on the top-level error; failing that,
//! the first entry whose matcher accepts the error anywhere in its source
//! chain (or via a predicate) wins. Unmatched errors propagate.
//!
//! ```
//! use hapic_core::exception::{ErrorMapping, ErrorMatcher, ExceptionMapper};
//! use http::StatusCode;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("user not found")]
//! struct UserNotFound;
//!
//! let mut mapper = ExceptionMapper::new();
//! mapper.push(ErrorMapping::new(ErrorMatcher::of::<UserNotFound>(), StatusCode::NOT_FOUND));
//!
//! let err = anyhow::Error::new(UserNotFound);
//! assert_eq!(mapper.find(&err).map(|m| m.status), Some(StatusCode::NOT_FOUND));
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

/// Predicate deciding whether an error matches.
pub type ErrorPredicate = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// How an [`ErrorMapping`] recognizes an error.
#[derive(Clone)]
pub enum ErrorMatcher {
    /// The top-level error is exactly this type.
    Exact {
        /// Rust type name, for logs and documentation.
        type_name: &'static str,
        /// Type check.
        matches: fn(&anyhow::Error) -> bool,
    },
    /// An error of this type appears anywhere in the source chain.
    Chain {
        /// Rust type name, for logs and documentation.
        type_name: &'static str,
        /// Chain check.
        matches: fn(&anyhow::Error) -> bool,
    },
    /// A custom predicate.
    Predicate {
        /// Label used in logs and documentation.
        label: String,
        /// The predicate.
        predicate: ErrorPredicate,
    },
    /// Any error.
    Any,
}

fn is_exact<E: StdError + Send + Sync + 'static>(err: &anyhow::Error) -> bool {
    err.is::<E>()
}

fn in_chain<E: StdError + Send + Sync + 'static>(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<E>())
}

impl ErrorMatcher {
    /// Matches errors whose top-level type is `E`.
    #[must_use]
    pub fn of<E: StdError + Send + Sync + 'static>() -> Self {
        Self::Exact {
            type_name: std::any::type_name::<E>(),
            matches: is_exact::<E>,
        }
    }

    /// Matches errors with an `E` anywhere in their source chain.
    #[must_use]
    pub fn caused_by<E: StdError + Send + Sync + 'static>() -> Self {
        Self::Chain {
            type_name: std::any::type_name::<E>(),
            matches: in_chain::<E>,
        }
    }

    /// Matches errors accepted by `predicate`.
    #[must_use]
    pub fn predicate(
        label: impl Into<String>,
        predicate: impl Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Predicate {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Returns true if this matcher accepts `err`.
    #[must_use]
    pub fn matches(&self, err: &anyhow::Error) -> bool {
        match self {
            Self::Exact { matches, .. } | Self::Chain { matches, .. } => matches(err),
            Self::Predicate { predicate, .. } => predicate(err),
            Self::Any => true,
        }
    }

    /// Returns true for exact type matchers.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact { .. })
    }

    /// Short label for logs and documentation.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Exact { type_name, .. } | Self::Chain { type_name, .. } => {
                type_name.rsplit("::").next().unwrap_or(*type_name)
            }
            Self::Predicate { label, .. } => label,
            Self::Any => "Error",
        }
    }
}

impl fmt::Debug for ErrorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact { type_name, .. } => f.debug_tuple("Exact").field(type_name).finish(),
            Self::Chain { type_name, .. } => f.debug_tuple("Chain").field(type_name).finish(),
            Self::Predicate { label, .. } => f.debug_tuple("Predicate").field(label).finish(),
            Self::Any => f.write_str("Any"),
        }
    }
}

/// One row of the error table.
#[derive(Debug, Clone)]
pub struct ErrorMapping {
    /// Which errors this row handles.
    pub matcher: ErrorMatcher,
    /// Response status.
    pub status: StatusCode,
    /// Response description for documentation.
    pub description: Option<String>,
}

impl ErrorMapping {
    /// Creates a mapping.
    #[must_use]
    pub fn new(matcher: ErrorMatcher, status: StatusCode) -> Self {
        Self {
            matcher,
            status,
            description: None,
        }
    }

    /// Sets the documentation description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Ordered error table for one controller.
#[derive(Debug, Clone, Default)]
pub struct ExceptionMapper {
    entries: Vec<ErrorMapping>,
}

impl ExceptionMapper {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, mapping: ErrorMapping) {
        self.entries.push(mapping);
    }

    /// Returns the entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[ErrorMapping] {
        &self.entries
    }

    /// Returns true if no entry is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the entry handling `err`.
    #[must_use]
    pub fn find(&self, err: &anyhow::Error) -> Option<&ErrorMapping> {
        self.entries
            .iter()
            .find(|e| e.matcher.is_exact() && e.matcher.matches(err))
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| !e.matcher.is_exact() && e.matcher.matches(err))
            })
    }

    /// Finds the entry overriding the status of an input validation failure.
    ///
    /// Catch-all entries are ignored here; only entries naming the
    /// validation error explicitly apply.
    #[must_use]
    pub fn find_for_validation(&self, err: &anyhow::Error) -> Option<&ErrorMapping> {
        self.entries
            .iter()
            .find(|e| e.matcher.is_exact() && e.matcher.matches(err))
            .or_else(|| {
                self.entries.iter().find(|e| {
                    !e.matcher.is_exact()
                        && !matches!(e.matcher, ErrorMatcher::Any)
                        && e.matcher.matches(err)
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("not found")]
    struct NotFound;

    #[derive(Debug, thiserror::Error)]
    #[error("storage failed")]
    struct StorageError {
        #[source]
        source: NotFound,
    }

    #[test]
    fn test_exact_match_wins_over_earlier_chain_match() {
        let mut mapper = ExceptionMapper::new();
        mapper.push(ErrorMapping::new(ErrorMatcher::Any, StatusCode::INTERNAL_SERVER_ERROR));
        mapper.push(ErrorMapping::new(ErrorMatcher::of::<NotFound>(), StatusCode::NOT_FOUND));

        let err = anyhow::Error::new(NotFound);
        assert_eq!(mapper.find(&err).unwrap().status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_chain_match() {
        let mut mapper = ExceptionMapper::new();
        mapper.push(ErrorMapping::new(ErrorMatcher::of::<NotFound>(), StatusCode::NOT_FOUND));
        mapper.push(ErrorMapping::new(
            ErrorMatcher::caused_by::<NotFound>(),
            StatusCode::GONE,
        ));

        let err = anyhow::Error::new(StorageError { source: NotFound });
        assert_eq!(mapper.find(&err).unwrap().status, StatusCode::GONE);
    }

    #[test]
    fn test_predicate_and_fallthrough() {
        let mut mapper = ExceptionMapper::new();
        mapper.push(ErrorMapping::new(
            ErrorMatcher::predicate("timeout", |e| e.to_string().contains("timeout")),
            StatusCode::GATEWAY_TIMEOUT,
        ));

        assert!(mapper.find(&anyhow::anyhow!("upstream timeout")).is_some());
        assert!(mapper.find(&anyhow::anyhow!("boom")).is_none());
    }

    #[test]
    fn test_validation_lookup_ignores_catch_all() {
        let mut mapper = ExceptionMapper::new();
        mapper.push(ErrorMapping::new(ErrorMatcher::Any, StatusCode::INTERNAL_SERVER_ERROR));
        assert!(mapper.find_for_validation(&anyhow::anyhow!("x")).is_none());
    }

    #[test]
    fn test_labels() {
        assert_eq!(ErrorMatcher::of::<NotFound>().label(), "NotFound");
        assert_eq!(ErrorMatcher::Any.label(), "Error");
        let mapping = ErrorMapping::new(ErrorMatcher::of::<NotFound>(), StatusCode::NOT_FOUND)
            .with_description("User not found");
        assert_eq!(mapping.description.as_deref(), Some("User not found"));
    }
}
