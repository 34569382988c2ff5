//! Multipart form data parsing.
//!
//! `multipart/form-data` bodies are parsed once, when the request is read,
//! into plain form fields and [`UploadedFile`]s. Parts carrying a file name
//! are files; every other part is a text field.

use std::io;

use bytes::Bytes;
use hapic_core::UploadedFile;
use http::{header, HeaderMap};

use crate::error::{HttpError, HttpResult, RequestSource};

/// Default maximum total body size for multipart (50 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 50 * 1024 * 1024;

/// Default maximum size per field (10 MB).
pub const DEFAULT_MAX_FIELD_SIZE: usize = 10 * 1024 * 1024;

/// Limits applied while parsing multipart bodies.
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Maximum total body size in bytes.
    pub max_body_size: usize,
    /// Maximum size per field in bytes.
    pub max_field_size: usize,
    /// Maximum number of fields allowed.
    pub max_fields: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
            max_fields: 100,
        }
    }
}

impl MultipartConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum body size.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the maximum field size.
    #[must_use]
    pub fn max_field_size(mut self, size: usize) -> Self {
        self.max_field_size = size;
        self
    }

    /// Set the maximum number of fields.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }
}

/// Text fields and files of a parsed multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    /// Text fields in request order.
    pub fields: Vec<(String, String)>,
    /// Uploaded files in request order.
    pub files: Vec<UploadedFile>,
}

/// Returns true if the request declares a multipart body.
pub(crate) fn is_multipart(headers: &HeaderMap) -> bool {
    content_type(headers).is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

pub(crate) fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
}

/// Parses a multipart body.
pub async fn parse_multipart(
    headers: &HeaderMap,
    body: Bytes,
    config: &MultipartConfig,
) -> HttpResult<MultipartForm> {
    let content_type = content_type(headers).ok_or_else(|| {
        HttpError::malformed(RequestSource::Multipart, "missing Content-Type header")
    })?;

    let boundary = multer::parse_boundary(content_type).map_err(|_| {
        HttpError::malformed(
            RequestSource::Multipart,
            "missing or invalid boundary in multipart Content-Type",
        )
    })?;

    if body.len() > config.max_body_size {
        return Err(HttpError::payload_too_large(config.max_body_size, body.len()));
    }

    let stream = futures_util::stream::once(async move { Ok::<_, io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut form = MultipartForm::default();
    let mut field_count = 0;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::malformed(RequestSource::Multipart, e.to_string()))?
    {
        field_count += 1;
        if field_count > config.max_fields {
            return Err(HttpError::malformed(
                RequestSource::Multipart,
                format!("too many fields (max {})", config.max_fields),
            ));
        }

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        let part_type = field.content_type().map(ToString::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| HttpError::malformed(RequestSource::Multipart, e.to_string()))?;

        if data.len() > config.max_field_size {
            return Err(HttpError::payload_too_large(config.max_field_size, data.len()));
        }

        match file_name {
            Some(file_name) => {
                let mut file = UploadedFile::new(name, data).with_file_name(file_name);
                if let Some(part_type) = part_type {
                    file = file.with_content_type(part_type);
                }
                form.files.push(file);
            }
            None => {
                let text = String::from_utf8(data.to_vec()).map_err(|_| {
                    HttpError::malformed(
                        RequestSource::Multipart,
                        format!("field '{name}' is not valid UTF-8"),
                    )
                })?;
                form.fields.push((name, text));
            }
        }
    }

    tracing::trace!(
        fields = form.fields.len(),
        files = form.files.len(),
        "parsed multipart body"
    );
    Ok(form)
}
