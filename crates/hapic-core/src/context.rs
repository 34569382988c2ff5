//! The context adapter contract.
//!
//! A [`Context`] is implemented once per web framework. It reads raw request
//! data, builds framework-native responses and finds the route a controller
//! is mounted on. Everything else (validation, error mapping, streaming,
//! documentation) is framework-agnostic and lives in the pipeline.

use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use http::StatusCode;
use serde_json::Value;

use crate::data::{HapicFile, RequestParameters};
use crate::description::{DecoratedController, RouteRepresentation};
use crate::error::{HapicError, ProcessValidationError};

/// Blocking iterator of encoded stream chunks.
pub type ChunkIter = Box<dyn Iterator<Item = Bytes> + Send>;

/// Framework adapter consumed by the pipeline and the doc generator.
pub trait Context: Send + Sync + 'static {
    /// The framework's request type.
    type Request: Send + 'static;

    /// The framework's response type.
    type Response: Send + 'static;

    /// Reads the raw request slices.
    fn get_request_parameters(
        &self,
        request: &Self::Request,
    ) -> Result<RequestParameters, HapicError>;

    /// Builds a JSON response. `204 No Content` responses carry no body.
    fn get_response(&self, body: Value, http_code: StatusCode) -> Self::Response;

    /// Builds a validation error response.
    fn get_validation_error_response(
        &self,
        error: &ProcessValidationError,
        http_code: StatusCode,
    ) -> Self::Response;

    /// Builds a response streaming the file's bytes.
    fn get_file_response(
        &self,
        file: HapicFile,
        http_code: StatusCode,
    ) -> Result<Self::Response, HapicError>;

    /// Builds a response whose body is written chunk by chunk as the stream
    /// yields. Dropping the response body drops the stream.
    fn get_stream_response(
        &self,
        chunks: BoxStream<'static, Bytes>,
        http_code: StatusCode,
    ) -> Self::Response;

    /// Blocking variant of [`Context::get_stream_response`].
    ///
    /// Chunks are still pulled one at a time, when the body is polled.
    fn get_blocking_stream_response(
        &self,
        chunks: ChunkIter,
        http_code: StatusCode,
    ) -> Self::Response {
        self.get_stream_response(Box::pin(stream::iter(chunks)), http_code)
    }

    /// Finds the route a controller is mounted on.
    ///
    /// Fails with [`HapicError::NoRoutes`] when the framework has no routes
    /// and [`HapicError::RouteNotFound`] when the controller is not mounted.
    fn find_route(
        &self,
        controller: &DecoratedController,
    ) -> Result<RouteRepresentation, HapicError>;

    /// Translates a native path template to OpenAPI syntax (`/users/{id}`).
    fn get_swagger_path(&self, rule: &str) -> String;
}
