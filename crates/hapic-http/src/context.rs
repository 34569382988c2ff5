//! The HTTP context adapter.

use std::fmt;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use futures_util::stream::BoxStream;
use hapic_core::{
    Context, DecoratedController, DefaultErrorBuilder, ErrorBuilder, HapicError, HapicFile,
    ProcessValidationError, RequestParameters, RouteRepresentation,
};
use http::StatusCode;
use regex::Regex;
use serde_json::Value;

use crate::error::{HttpError, HttpResult, RequestSource};
use crate::multipart::content_type;
use crate::request::HttpRequest;
use crate::response::{
    file_response, json_response, stream_response, HttpResponse, DEFAULT_CHUNK_SIZE,
};
use crate::router::RouteTable;

/// [`Context`] over [`HttpRequest`] and `http::Response`.
///
/// Created by [`HttpRouter::context`](crate::HttpRouter::context).
///
/// Request bodies are decoded by content type:
///
/// - `multipart/form-data`: text parts become form fields, file parts files
/// - `application/x-www-form-urlencoded`: form fields
/// - anything else: JSON, or a JSON string when the body is not JSON; an
///   empty body is `null`
#[derive(Clone)]
pub struct HttpContext {
    table: RouteTable,
    error_builder: Arc<dyn ErrorBuilder>,
    chunk_size: usize,
}

impl fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpContext")
            .field("routes", &self.table.read().len())
            .field("error_builder", &self.error_builder)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl HttpContext {
    pub(crate) fn new(table: RouteTable) -> Self {
        Self {
            table,
            error_builder: Arc::new(DefaultErrorBuilder::new()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the builder of validation error bodies.
    #[must_use]
    pub fn with_error_builder(mut self, error_builder: impl ErrorBuilder + 'static) -> Self {
        self.error_builder = Arc::new(error_builder);
        self
    }

    /// Sets the size of the chunks read from files.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn read_parameters(request: &HttpRequest) -> HttpResult<RequestParameters> {
        let mut params = RequestParameters::new();

        params.path = request.path_params().clone();

        if let Some(query) = request.uri().query() {
            params.query = serde_urlencoded::from_str(query)
                .map_err(|e| HttpError::malformed(RequestSource::Query, e.to_string()))?;
        }

        for (name, value) in request.headers() {
            match value.to_str() {
                Ok(value) => {
                    params.headers.insert(name.as_str().to_string(), value.to_string());
                }
                Err(_) => tracing::debug!(header = %name, "skipping non-ASCII header value"),
            }
        }

        if let Some(form) = request.multipart() {
            params.form.clone_from(&form.fields);
            for file in &form.files {
                params.files.insert(file.name.clone(), file.clone());
            }
        } else if is_urlencoded(request) {
            params.form = serde_urlencoded::from_bytes(request.body())
                .map_err(|e| HttpError::malformed(RequestSource::Body, e.to_string()))?;
        } else {
            params.body = decode_body(request.body());
        }

        Ok(params)
    }
}

fn is_urlencoded(request: &HttpRequest) -> bool {
    content_type(request.headers())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn decode_body(body: &Bytes) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// Translates `:name` segments to `{name}`.
fn swagger_path(rule: &str) -> String {
    static PARAM_REGEX: OnceLock<Regex> = OnceLock::new();
    let param_regex = PARAM_REGEX
        .get_or_init(|| Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex"));
    param_regex.replace_all(rule, "{$1}").into_owned()
}

impl Context for HttpContext {
    type Request = HttpRequest;
    type Response = HttpResponse;

    fn get_request_parameters(&self, request: &HttpRequest) -> Result<RequestParameters, HapicError> {
        Self::read_parameters(request).map_err(HapicError::from)
    }

    fn get_response(&self, body: Value, http_code: StatusCode) -> HttpResponse {
        json_response(&body, http_code)
    }

    fn get_validation_error_response(
        &self,
        error: &ProcessValidationError,
        http_code: StatusCode,
    ) -> HttpResponse {
        json_response(&self.error_builder.build_from_validation_error(error), http_code)
    }

    fn get_file_response(
        &self,
        file: HapicFile,
        http_code: StatusCode,
    ) -> Result<HttpResponse, HapicError> {
        file_response(file, http_code, self.chunk_size)
    }

    fn get_stream_response(
        &self,
        chunks: BoxStream<'static, Bytes>,
        http_code: StatusCode,
    ) -> HttpResponse {
        stream_response(chunks, http_code)
    }

    fn find_route(&self, controller: &DecoratedController) -> Result<RouteRepresentation, HapicError> {
        let table = self.table.read();
        if table.is_empty() {
            return Err(HapicError::NoRoutes);
        }
        table
            .iter()
            .find(|mounted| mounted.token == controller.token)
            .map(|mounted| mounted.route.clone())
            .ok_or_else(|| HapicError::route_not_found(&controller.name))
    }

    fn get_swagger_path(&self, rule: &str) -> String {
        swagger_path(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::tests::{multipart_body, multipart_headers};
    use crate::multipart::MultipartConfig;
    use crate::HttpRouter;
    use http::{header, HeaderMap, HeaderValue, Method, Uri};
    use indexmap::IndexMap;
    use serde_json::json;

    fn request(uri: &'static str, content_type: Option<&'static str>, body: &'static [u8]) -> HttpRequest {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        headers.insert("x-api-key", HeaderValue::from_static("secret"));
        HttpRequest::new(
            Method::POST,
            Uri::from_static(uri),
            headers,
            Bytes::from_static(body),
        )
    }

    fn context() -> HttpContext {
        HttpRouter::new().context()
    }

    #[test]
    fn test_swagger_path() {
        assert_eq!(swagger_path("/users/:id"), "/users/{id}");
        assert_eq!(
            swagger_path("/users/:user_id/photos/:photo_id"),
            "/users/{user_id}/photos/{photo_id}"
        );
        assert_eq!(swagger_path("/users"), "/users");
    }

    #[test]
    fn test_json_body_query_and_headers() {
        let mut path = IndexMap::new();
        path.insert("id".to_string(), "42".to_string());
        let request = request(
            "/users/42?name=bob&tag=a&tag=b",
            Some("application/json"),
            b"{\"name\":\"bob\"}",
        )
        .with_path_params(path);

        let params = context().get_request_parameters(&request).unwrap();
        assert_eq!(params.path["id"], "42");
        assert_eq!(params.query.len(), 3);
        assert_eq!(params.body, json!({"name": "bob"}));
        assert_eq!(params.headers["x-api-key"], "secret");
        assert_eq!(params.query_value(&["tag".to_string()])["tag"], json!(["a", "b"]));
    }

    #[test]
    fn test_body_decoding() {
        let params = context()
            .get_request_parameters(&request("/", None, b""))
            .unwrap();
        assert_eq!(params.body, Value::Null);

        let params = context()
            .get_request_parameters(&request("/", Some("text/plain"), b"hello"))
            .unwrap();
        assert_eq!(params.body, json!("hello"));
    }

    #[test]
    fn test_urlencoded_form() {
        let request = request(
            "/login",
            Some("application/x-www-form-urlencoded"),
            b"username=alice&password=hello+world",
        );
        let params = context().get_request_parameters(&request).unwrap();
        assert_eq!(
            params.form,
            vec![
                ("username".to_string(), "alice".to_string()),
                ("password".to_string(), "hello world".to_string()),
            ]
        );
        assert_eq!(params.body, Value::Null);
    }

    #[tokio::test]
    async fn test_multipart_form() {
        let mut builder = http::Request::post("/photos");
        *builder.headers_mut().unwrap() = multipart_headers();
        let request = builder
            .body(http_body_util::Full::new(multipart_body()))
            .unwrap();
        let request = HttpRequest::read(request, &MultipartConfig::new()).await.unwrap();

        let params = context().get_request_parameters(&request).unwrap();
        assert_eq!(params.form, vec![("title".to_string(), "Holidays".to_string())]);
        assert!(params.files.contains_key("photo"));
    }

    #[test]
    fn test_find_route_without_routes() {
        let controller = DecoratedController::new("get_user", Default::default());
        assert!(matches!(
            context().find_route(&controller),
            Err(HapicError::NoRoutes)
        ));
    }
}
