//! Buffered HTTP requests.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use http_body::Body;
use http_body_util::BodyExt;
use indexmap::IndexMap;

use crate::error::{HttpError, HttpResult};
use crate::multipart::{is_multipart, parse_multipart, MultipartConfig, MultipartForm};

/// A request whose body has been read, with the path parameters of the
/// route it matched.
///
/// Multipart bodies are parsed while reading, so that request parameters
/// can later be extracted without awaiting.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    multipart: Option<MultipartForm>,
    path_params: IndexMap<String, String>,
}

impl HttpRequest {
    /// Creates a request from already-buffered parts.
    ///
    /// Multipart bodies are not parsed; use [`HttpRequest::read`] for those.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            multipart: None,
            path_params: IndexMap::new(),
        }
    }

    /// Reads a request body to the end and parses it if it is multipart.
    pub async fn read<B>(request: http::Request<B>, config: &MultipartConfig) -> HttpResult<Self>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = request.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| HttpError::Body(e.to_string()))?
            .to_bytes();

        let multipart = if is_multipart(&parts.headers) {
            Some(parse_multipart(&parts.headers, body.clone(), config).await?)
        } else {
            None
        };

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            multipart,
            path_params: IndexMap::new(),
        })
    }

    /// Sets the path parameters.
    #[must_use]
    pub fn with_path_params(mut self, params: IndexMap<String, String>) -> Self {
        self.path_params = params;
        self
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parsed multipart body, if any.
    #[must_use]
    pub fn multipart(&self) -> Option<&MultipartForm> {
        self.multipart.as_ref()
    }

    /// Parameters captured by the matched route.
    #[must_use]
    pub fn path_params(&self) -> &IndexMap<String, String> {
        &self.path_params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::tests::{multipart_body, multipart_headers};
    use http_body_util::Full;

    #[tokio::test]
    async fn test_read_plain_body() {
        let request = http::Request::post("/users?x=1")
            .body(Full::new(Bytes::from_static(b"{\"name\":\"bob\"}")))
            .unwrap();
        let request = HttpRequest::read(request, &MultipartConfig::new()).await.unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri().query(), Some("x=1"));
        assert_eq!(request.body().as_ref(), b"{\"name\":\"bob\"}");
        assert!(request.multipart().is_none());
    }

    #[tokio::test]
    async fn test_read_multipart_body() {
        let mut builder = http::Request::post("/photos");
        *builder.headers_mut().unwrap() = multipart_headers();
        let request = builder.body(Full::new(multipart_body())).unwrap();
        let request = HttpRequest::read(request, &MultipartConfig::new()).await.unwrap();

        let form = request.multipart().unwrap();
        assert_eq!(form.fields.len(), 1);
        assert_eq!(form.files.len(), 1);
    }
}
