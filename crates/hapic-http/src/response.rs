//! Response bodies and builders.
//!
//! | Builder | Content-Type | Body |
//! |---------|--------------|------|
//! | [`json_response`] | `application/json` | buffered JSON, empty for `204` |
//! | [`stream_response`] | `application/x-ndjson` | one chunk per item, pulled on poll |
//! | [`file_response`] | from the file or guessed | read in chunks on poll |

use std::io::{self, Read};
use std::path::PathBuf;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use hapic_core::{HapicFile, HapicResult};
use http::{header, HeaderValue, Response, StatusCode};
use http_body::Frame;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use serde_json::Value;
use tokio::io::AsyncReadExt;

/// Body of every response built by the adapter.
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Response type of the adapter.
pub type HttpResponse = Response<ResponseBody>;

/// Size of the chunks read from files.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Content type of streamed item responses.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// A buffered body.
#[must_use]
pub fn full_body(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// An empty body.
#[must_use]
pub fn empty_body() -> ResponseBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}

/// A body written chunk by chunk as `chunks` yields.
#[must_use]
pub fn stream_body(chunks: BoxStream<'static, io::Result<Bytes>>) -> ResponseBody {
    StreamBody::new(chunks.map_ok(Frame::data)).boxed_unsync()
}

fn with_status(body: ResponseBody, status: StatusCode) -> HttpResponse {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}

/// JSON response. `204 No Content` responses have an empty body.
#[must_use]
pub fn json_response(body: &Value, status: StatusCode) -> HttpResponse {
    if status == StatusCode::NO_CONTENT {
        return with_status(empty_body(), status);
    }

    let mut response = with_status(full_body(body.to_string()), status);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Newline-delimited JSON response over pre-encoded chunks.
#[must_use]
pub fn stream_response(chunks: BoxStream<'static, Bytes>, status: StatusCode) -> HttpResponse {
    let mut response = with_status(stream_body(chunks.map(Ok).boxed()), status);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(NDJSON_CONTENT_TYPE),
    );
    response
}

/// File response, read lazily from the path or the reader.
pub fn file_response(file: HapicFile, status: StatusCode, chunk_size: usize) -> HapicResult<HttpResponse> {
    file.validate()?;

    let content_type = file.mimetype.clone().unwrap_or_else(|| {
        file.file_path
            .as_ref()
            .map(|path| mime_guess::from_path(path).first_or_octet_stream().to_string())
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
    });
    let content_length = file.content_length.or_else(|| {
        file.file_path
            .as_ref()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len())
    });
    let disposition = content_disposition(&file);

    let body = match (file.file_path, file.file_object) {
        (_, Some(reader)) => stream_body(read_chunks(reader, chunk_size)),
        (Some(path), None) => stream_body(read_file_chunks(path, chunk_size)),
        (None, None) => empty_body(),
    };

    let mut response = with_status(body, status);
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(len) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    if let Some(value) = disposition.and_then(|d| HeaderValue::from_str(&d).ok()) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

fn content_disposition(file: &HapicFile) -> Option<String> {
    let kind = if file.as_attachment { "attachment" } else { "inline" };
    match file.display_name() {
        Some(name) => Some(format!("{kind}; filename=\"{}\"", name.replace('"', "\\\""))),
        None if file.as_attachment => Some(kind.to_string()),
        None => None,
    }
}

/// Chunks of a blocking reader, read only when polled.
fn read_chunks(
    reader: Box<dyn Read + Send>,
    chunk_size: usize,
) -> BoxStream<'static, io::Result<Bytes>> {
    stream::try_unfold(reader, move |mut reader| async move {
        let mut buf = vec![0; chunk_size];
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok::<_, io::Error>(Some((Bytes::from(buf), reader)))
    })
    .boxed()
}

/// Chunks of a file on disk. The file is opened on the first poll.
fn read_file_chunks(path: PathBuf, chunk_size: usize) -> BoxStream<'static, io::Result<Bytes>> {
    let open = async move { tokio::fs::File::open(path).await };
    stream::once(open)
        .map_ok(move |file| {
            stream::try_unfold(file, move |mut file| async move {
                let mut buf = BytesMut::with_capacity(chunk_size);
                let n = file.read_buf(&mut buf).await?;
                if n == 0 {
                    return Ok(None);
                }
                Ok::<_, io::Error>(Some((buf.freeze(), file)))
            })
        })
        .try_flatten()
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    async fn body_bytes(response: HttpResponse) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_json_response() {
        let response = json_response(&json!({"name": "bob"}), StatusCode::CREATED);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_bytes(response).await.as_ref(), b"{\"name\":\"bob\"}");
    }

    #[tokio::test]
    async fn test_no_content_has_empty_body() {
        let response = json_response(&Value::Null, StatusCode::NO_CONTENT);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_stream_response() {
        let chunks = stream::iter(vec![Bytes::from("{\"a\":1}\n"), Bytes::from("{\"a\":2}\n")]);
        let response = stream_response(chunks.boxed(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], NDJSON_CONTENT_TYPE);
        assert_eq!(body_bytes(response).await.as_ref(), b"{\"a\":1}\n{\"a\":2}\n");
    }

    #[tokio::test]
    async fn test_file_response_from_path() {
        let mut tmp = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        tmp.write_all(b"hello file").unwrap();

        let file = HapicFile::from_path(tmp.path()).attachment();
        let response = file_response(file, StatusCode::OK, 4).unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename="));
        assert_eq!(body_bytes(response).await.as_ref(), b"hello file");
    }

    #[tokio::test]
    async fn test_file_response_from_bytes() {
        let file = HapicFile::from_bytes(&b"PNG"[..], "image/png").with_file_name("a.png");
        let response = file_response(file, StatusCode::OK, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"a.png\""
        );
        assert_eq!(body_bytes(response).await.as_ref(), b"PNG");
    }

    #[test]
    fn test_invalid_file_rejected() {
        assert!(file_response(HapicFile::new(), StatusCode::OK, DEFAULT_CHUNK_SIZE).is_err());
    }
}
