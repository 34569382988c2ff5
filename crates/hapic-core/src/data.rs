//! Request and response payload types.
//!
//! - [`RequestParameters`] - raw request slices read by a context adapter
//! - [`HapicData`] - validated slices handed to a controller
//! - [`UploadedFile`] - a multipart file upload
//! - [`HapicFile`] - a file returned by an `output_file` controller

use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::error::ProcessError;

/// A file that has been uploaded via a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// The form field name.
    pub name: String,
    /// The original file name from the client.
    pub file_name: Option<String>,
    /// The MIME type sent by the client.
    pub content_type: Option<String>,
    /// The file content.
    pub data: Bytes,
}

impl UploadedFile {
    /// Creates a new uploaded file.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Sets the client-side file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Metadata view validated by `file` schema fields.
    #[must_use]
    pub fn describe(&self) -> Value {
        json!({
            "file_name": self.file_name,
            "content_type": self.content_type,
            "size": self.data.len(),
        })
    }
}

/// Raw per-request data, as read by a context adapter.
///
/// Created once per request and read by every input stage.
#[derive(Debug, Clone, Default)]
pub struct RequestParameters {
    /// Path parameters captured by the framework's route.
    pub path: IndexMap<String, String>,
    /// Query string pairs, in order; keys may repeat.
    pub query: Vec<(String, String)>,
    /// Decoded body. `Null` when the request has no body.
    pub body: Value,
    /// Form fields (urlencoded or multipart), in order; keys may repeat.
    pub form: Vec<(String, String)>,
    /// Multipart file uploads by field name.
    pub files: IndexMap<String, UploadedFile>,
    /// Request headers, with lower-case names.
    pub headers: IndexMap<String, String>,
}

impl RequestParameters {
    /// Creates empty request parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path parameter.
    #[must_use]
    pub fn with_path(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    /// Adds a query pair.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Adds a form pair.
    #[must_use]
    pub fn with_form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// Adds an uploaded file.
    #[must_use]
    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.insert(file.name.clone(), file);
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Path slice as a JSON mapping.
    #[must_use]
    pub fn path_value(&self) -> Value {
        Value::Object(
            self.path
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    /// Query slice as a JSON mapping; keys in `as_list` collect every value.
    #[must_use]
    pub fn query_value(&self, as_list: &[String]) -> Value {
        pairs_to_value(&self.query, as_list)
    }

    /// Form slice as a JSON mapping; keys in `as_list` collect every value.
    #[must_use]
    pub fn form_value(&self, as_list: &[String]) -> Value {
        pairs_to_value(&self.form, as_list)
    }

    /// File slice as a JSON mapping of upload metadata.
    #[must_use]
    pub fn files_value(&self) -> Value {
        Value::Object(
            self.files
                .iter()
                .map(|(name, file)| (name.clone(), file.describe()))
                .collect(),
        )
    }

    /// Header slice as a JSON mapping.
    #[must_use]
    pub fn headers_value(&self) -> Value {
        Value::Object(
            self.headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Folds repeated pairs into a mapping. Without `as_list` the first value wins.
fn pairs_to_value(pairs: &[(String, String)], as_list: &[String]) -> Value {
    let mut out = Map::new();
    for (key, value) in pairs {
        if as_list.contains(key) {
            let entry = out
                .entry(key.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = entry {
                values.push(Value::String(value.clone()));
            }
        } else if !out.contains_key(key) {
            out.insert(key.clone(), Value::String(value.clone()));
        }
    }
    // Declared list keys absent from the request still load as empty lists.
    for key in as_list {
        out.entry(key.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
    }
    Value::Object(out)
}

/// Validated request data handed to a controller.
///
/// Each slice holds the loaded output of its input stage, or an empty
/// mapping when the controller declares no such stage.
#[derive(Debug, Clone)]
pub struct HapicData {
    /// Validated path parameters.
    pub path: Value,
    /// Validated query parameters.
    pub query: Value,
    /// Validated body.
    pub body: Value,
    /// Validated form fields.
    pub forms: Value,
    /// Uploaded files accepted by the files stage.
    pub files: IndexMap<String, UploadedFile>,
    /// Validated headers.
    pub headers: Value,
}

impl Default for HapicData {
    fn default() -> Self {
        Self {
            path: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            body: Value::Object(Map::new()),
            forms: Value::Object(Map::new()),
            files: IndexMap::new(),
            headers: Value::Object(Map::new()),
        }
    }
}

impl HapicData {
    /// Deserializes the path slice.
    pub fn path_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.path.clone())
    }

    /// Deserializes the query slice.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.query.clone())
    }

    /// Deserializes the body.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }

    /// Deserializes the form slice.
    pub fn forms_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.forms.clone())
    }
}

/// A file returned by an `output_file` controller.
///
/// Exactly one of `file_path` and `file_object` must be set, and a
/// `mimetype` is required with `file_object`. The invariant is checked by
/// [`Processor::dump_output_file`](crate::Processor::dump_output_file), not
/// at construction.
pub struct HapicFile {
    /// Path of a file on disk.
    pub file_path: Option<PathBuf>,
    /// An open readable handle.
    pub file_object: Option<Box<dyn Read + Send>>,
    /// Content type; guessed from the path when absent.
    pub mimetype: Option<String>,
    /// Name presented to the client.
    pub file_name: Option<String>,
    /// Whether the client should save rather than display the file.
    pub as_attachment: bool,
    /// Content length, when known up front.
    pub content_length: Option<u64>,
}

impl HapicFile {
    /// Creates an empty file description; set a path or an object on it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            file_path: None,
            file_object: None,
            mimetype: None,
            file_name: None,
            as_attachment: false,
            content_length: None,
        }
    }

    /// A file on disk.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            file_path: Some(path.as_ref().to_path_buf()),
            ..Self::new()
        }
    }

    /// An open handle with its content type.
    #[must_use]
    pub fn from_reader(reader: impl Read + Send + 'static, mimetype: impl Into<String>) -> Self {
        Self {
            file_object: Some(Box::new(reader)),
            mimetype: Some(mimetype.into()),
            ..Self::new()
        }
    }

    /// In-memory content with its content type.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>, mimetype: impl Into<String>) -> Self {
        let data = data.into();
        let len = data.len() as u64;
        Self {
            content_length: Some(len),
            ..Self::from_reader(Cursor::new(data), mimetype)
        }
    }

    /// Sets the path.
    #[must_use]
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the readable handle.
    #[must_use]
    pub fn with_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.file_object = Some(Box::new(reader));
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    /// Sets the name presented to the client.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Marks the file as an attachment.
    #[must_use]
    pub fn attachment(mut self) -> Self {
        self.as_attachment = true;
        self
    }

    /// Checks the exactly-one-of invariant without reading content.
    pub fn validate(&self) -> Result<(), ProcessError> {
        match (&self.file_path, &self.file_object) {
            (Some(_), Some(_)) => Err(ProcessError::invalid_file(
                "file_path and file_object cannot both be set",
            )),
            (None, None) => Err(ProcessError::invalid_file(
                "either file_path or file_object must be set",
            )),
            (Some(path), None) => {
                if path.is_file() {
                    Ok(())
                } else {
                    Err(ProcessError::invalid_file(format!(
                        "file {} does not exist",
                        path.display()
                    )))
                }
            }
            (None, Some(_)) => {
                if self.mimetype.is_some() {
                    Ok(())
                } else {
                    Err(ProcessError::invalid_file(
                        "mimetype is required when file_object is set",
                    ))
                }
            }
        }
    }

    /// Name presented to the client, falling back to the path's file name.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        self.file_name.clone().or_else(|| {
            self.file_path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
        })
    }
}

impl Default for HapicFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HapicFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HapicFile")
            .field("file_path", &self.file_path)
            .field("file_object", &self.file_object.as_ref().map(|_| "<reader>"))
            .field("mimetype", &self.mimetype)
            .field("file_name", &self.file_name)
            .field("as_attachment", &self.as_attachment)
            .field("content_length", &self.content_length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_first_value_wins() {
        let params = RequestParameters::new()
            .with_query("name", "a")
            .with_query("name", "b");
        assert_eq!(params.query_value(&[]), json!({"name": "a"}));
    }

    #[test]
    fn test_query_as_list() {
        let params = RequestParameters::new()
            .with_query("tag", "a")
            .with_query("page", "1")
            .with_query("tag", "b");
        let value = params.query_value(&["tag".to_string(), "sort".to_string()]);
        assert_eq!(value, json!({"tag": ["a", "b"], "page": "1", "sort": []}));
    }

    #[test]
    fn test_path_and_headers() {
        let params = RequestParameters::new()
            .with_path("id", "7")
            .with_header("X-Token", "abc");
        assert_eq!(params.path_value(), json!({"id": "7"}));
        assert_eq!(params.headers_value(), json!({"x-token": "abc"}));
    }

    #[test]
    fn test_files_value() {
        let params = RequestParameters::new().with_file(
            UploadedFile::new("avatar", "png-bytes")
                .with_file_name("me.png")
                .with_content_type("image/png"),
        );
        assert_eq!(
            params.files_value(),
            json!({"avatar": {"file_name": "me.png", "content_type": "image/png", "size": 9}})
        );
    }

    #[test]
    fn test_hapic_data_typed_access() {
        #[derive(serde::Deserialize)]
        struct Path {
            id: i64,
        }

        let data = HapicData {
            path: json!({"id": 3}),
            ..HapicData::default()
        };
        assert_eq!(data.path_as::<Path>().unwrap().id, 3);
        assert_eq!(data.body, json!({}));
    }

    #[test]
    fn test_file_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "hello").unwrap();

        assert!(HapicFile::from_path(&path).validate().is_ok());
        assert!(HapicFile::from_bytes("x", "text/plain").validate().is_ok());

        let both = HapicFile::from_path(&path).with_reader(Cursor::new(Vec::new()));
        assert!(both.validate().is_err());
        assert!(HapicFile::new().validate().is_err());
        assert!(HapicFile::from_path(dir.path().join("missing.txt"))
            .validate()
            .is_err());
        let no_mimetype = HapicFile::new().with_reader(Cursor::new(Vec::new()));
        assert!(no_mimetype.validate().is_err());
    }

    #[test]
    fn test_display_name() {
        let file = HapicFile::from_path("/tmp/data/report.csv");
        assert_eq!(file.display_name().as_deref(), Some("report.csv"));
        let file = file.with_file_name("export.csv");
        assert_eq!(file.display_name().as_deref(), Some("export.csv"));
    }
}
