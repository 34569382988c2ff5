//! In-memory routing of requests to decorated controllers.
//!
//! Routes use the native `:name` parameter syntax (`/users/:id`). The
//! router shares its route table with every [`HttpContext`] it creates, so
//! routes mounted after the context was handed to `Hapic` are still found
//! at doc generation time.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut router = HttpRouter::new();
//! hapic.set_context(router.context())?;
//!
//! router.route(Method::GET, "/users/:id", &get_user);
//! let response = router.dispatch(request).await;
//! ```

use std::sync::Arc;

use hapic_core::schema::{ErrorDetails, SCHEMA_ERROR_KEY};
use hapic_core::{
    ControllerToken, DecoratedController, DefaultErrorBuilder, ErrorBuilder, HapicError,
    ProcessValidationError, RouteRepresentation,
};
use hapic_pipeline::Controller;
use http::{Method, StatusCode};
use http_body::Body;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::json;

use crate::context::HttpContext;
use crate::multipart::MultipartConfig;
use crate::request::HttpRequest;
use crate::response::{json_response, HttpResponse};

/// A route as seen by the context adapter.
#[derive(Debug, Clone)]
pub(crate) struct MountedRoute {
    pub(crate) token: ControllerToken,
    pub(crate) route: RouteRepresentation,
}

/// Route table shared between a router and its contexts.
pub(crate) type RouteTable = Arc<RwLock<Vec<MountedRoute>>>;

/// A segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// A literal segment (e.g., "users")
    Literal(String),

    /// A parameter segment (e.g., ":id")
    Param(String),
}

fn parse_segments(rule: &str) -> Vec<PathSegment> {
    rule.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) => PathSegment::Param(name.to_string()),
            None => PathSegment::Literal(s.to_string()),
        })
        .collect()
}

/// A mounted controller.
struct Route {
    method: Method,
    segments: Vec<PathSegment>,
    controller: Controller<HttpContext>,
}

impl Route {
    /// Returns the captured parameters if `path` matches.
    ///
    /// Segments are percent-decoded before matching.
    fn match_path(&self, path: &str) -> Option<IndexMap<String, String>> {
        let path_segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_segment)
            .collect();

        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = IndexMap::new();
        for (pattern, actual) in self.segments.iter().zip(path_segments) {
            match pattern {
                PathSegment::Literal(expected) => {
                    if *expected != actual {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    params.insert(name.clone(), actual);
                }
            }
        }
        Some(params)
    }
}

/// Percent-decodes one path segment. Invalid UTF-8 is replaced lossily.
fn decode_segment(segment: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned()
}

/// Routes requests to decorated controllers.
pub struct HttpRouter {
    routes: Vec<Route>,
    table: RouteTable,
    multipart: MultipartConfig,
    errors: DefaultErrorBuilder,
}

impl Default for HttpRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRouter")
            .field("routes", &self.table.read().len())
            .field("multipart", &self.multipart)
            .finish_non_exhaustive()
    }
}

impl HttpRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            table: Arc::new(RwLock::new(Vec::new())),
            multipart: MultipartConfig::default(),
            errors: DefaultErrorBuilder::new(),
        }
    }

    /// Sets the limits used when reading multipart bodies.
    #[must_use]
    pub fn with_multipart_config(mut self, config: MultipartConfig) -> Self {
        self.multipart = config;
        self
    }

    /// A context adapter sharing this router's route table.
    #[must_use]
    pub fn context(&self) -> HttpContext {
        HttpContext::new(Arc::clone(&self.table))
    }

    /// Mounts a controller on `rule` for `method`.
    pub fn route(&mut self, method: Method, rule: &str, controller: &Controller<HttpContext>) {
        let decorated: &DecoratedController = controller.decorated();
        tracing::debug!(
            method = %method,
            rule = %rule,
            controller = %decorated.name,
            "route mounted"
        );

        self.table.write().push(MountedRoute {
            token: decorated.token,
            route: RouteRepresentation::new(rule, method.as_str()),
        });
        self.routes.push(Route {
            method,
            segments: parse_segments(rule),
            controller: controller.clone(),
        });
    }

    /// Number of mounted routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no route is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Handles one request.
    ///
    /// Unknown paths answer `404`, known paths with another method `405`,
    /// and handler errors not mapped by the controller `500`.
    pub async fn dispatch<B>(&self, request: http::Request<B>) -> HttpResponse
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let path = request.uri().path().to_string();
        let mut path_matched = false;
        let mut found = None;
        for route in &self.routes {
            if let Some(params) = route.match_path(&path) {
                path_matched = true;
                if route.method == *request.method() {
                    found = Some((route, params));
                    break;
                }
            }
        }

        let Some((route, params)) = found else {
            let status = if path_matched {
                StatusCode::METHOD_NOT_ALLOWED
            } else {
                StatusCode::NOT_FOUND
            };
            tracing::debug!(path = %path, status = status.as_u16(), "no route");
            return self.error_response(status);
        };

        let request = match HttpRequest::read(request, &self.multipart).await {
            Ok(request) => request.with_path_params(params),
            Err(err) => {
                tracing::debug!(error = %err, "cannot read request");
                let mut details = ErrorDetails::new();
                details.insert(SCHEMA_ERROR_KEY.to_string(), vec![err.to_string()]);
                let body = self
                    .errors
                    .build_from_validation_error(&ProcessValidationError::input(details));
                return json_response(&body, StatusCode::BAD_REQUEST);
            }
        };

        match route.controller.call(request).await {
            Ok(response) => response,
            Err(HapicError::Handler(err)) => {
                tracing::error!(
                    controller = %route.controller.name(),
                    error = %err,
                    "unhandled handler error"
                );
                self.error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Err(err) => {
                tracing::error!(
                    controller = %route.controller.name(),
                    error = %err,
                    "controller failed"
                );
                self.error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn error_response(&self, status: StatusCode) -> HttpResponse {
        let message = status.canonical_reason().unwrap_or("Error");
        json_response(&json!({"message": message, "details": {}}), status)
    }
}
