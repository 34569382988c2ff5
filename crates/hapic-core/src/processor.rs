//! Processors bind one schema to the load/dump operations used by the pipeline.
//!
//! The pipeline only talks to the [`Processor`] trait, so the validation
//! backend can be swapped per decorator or globally through a
//! [`ProcessorFactory`]. [`SchemaProcessor`] is the default backend, built on
//! [`Schema`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::data::HapicFile;
use crate::error::{ProcessError, ProcessValidationError};
use crate::schema::{LoadError, Schema};

/// Creates a processor bound to a schema.
///
/// Called once per decorator, when the controller is decorated.
pub type ProcessorFactory = Arc<dyn Fn(Arc<Schema>) -> Box<dyn Processor> + Send + Sync>;

/// Returns the factory producing [`SchemaProcessor`]s.
#[must_use]
pub fn default_processor_factory() -> ProcessorFactory {
    Arc::new(|schema| Box::new(SchemaProcessor::new(schema)))
}

/// Validation backend for one schema.
pub trait Processor: Send + Sync + fmt::Debug {
    /// Binds a schema, replacing any previous binding.
    fn set_schema(&mut self, schema: Arc<Schema>);

    /// Returns the bound schema.
    fn schema(&self) -> &Arc<Schema>;

    /// Validates and coerces raw request data.
    ///
    /// Fails with [`ProcessError::WrongInputShape`] when `raw` is not
    /// mapping-like, and with [`ProcessError::InputValidation`] otherwise.
    fn load_input(&self, raw: &Value) -> Result<Value, ProcessError>;

    /// Serializes and checks handler output.
    ///
    /// Fails with [`ProcessError::OutputValidation`].
    fn dump_output(&self, value: &Value) -> Result<Value, ProcessError>;

    /// Re-runs input validation and returns the structured error.
    ///
    /// A wrong top-level shape is reported under the `_schema` key. Valid
    /// input yields empty details.
    fn get_validation_error(&self, raw: &Value) -> ProcessValidationError;

    /// Checks a file payload and returns it unchanged. Never reads content.
    fn dump_output_file(&self, file: HapicFile) -> Result<HapicFile, ProcessError> {
        file.validate()?;
        Ok(file)
    }
}

/// Default processor backed by [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaProcessor {
    schema: Arc<Schema>,
}

impl SchemaProcessor {
    /// Creates a processor bound to `schema`.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }
}

impl Processor for SchemaProcessor {
    fn set_schema(&mut self, schema: Arc<Schema>) {
        self.schema = schema;
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn load_input(&self, raw: &Value) -> Result<Value, ProcessError> {
        self.schema.load(raw).map_err(|err| match err {
            LoadError::WrongShape { expected, found } => {
                ProcessError::WrongInputShape { expected, found }
            }
            LoadError::Fields(details) => {
                ProcessError::InputValidation(ProcessValidationError::input(details))
            }
        })
    }

    fn dump_output(&self, value: &Value) -> Result<Value, ProcessError> {
        let invalid = |err: LoadError| {
            ProcessError::OutputValidation(ProcessValidationError::output(err.details()))
        };

        let dumped = self.schema.dump(value).map_err(invalid)?;
        self.schema.load(&dumped).map_err(invalid)?;
        Ok(dumped)
    }

    fn get_validation_error(&self, raw: &Value) -> ProcessValidationError {
        match self.schema.load(raw) {
            Ok(_) => ProcessValidationError::input(Default::default()),
            Err(err) => ProcessValidationError::input(err.details()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{messages, Field};
    use serde_json::json;
    use std::io::Cursor;

    fn processor() -> SchemaProcessor {
        SchemaProcessor::new(
            Schema::builder("UserSchema")
                .field("first_name", Field::string().required())
                .field("last_name", Field::string().missing("Doe"))
                .build(),
        )
    }

    #[test]
    fn test_load_input_completes_defaults() {
        let loaded = processor()
            .load_input(&json!({"first_name": "John"}))
            .unwrap();
        assert_eq!(loaded, json!({"first_name": "John", "last_name": "Doe"}));
    }

    #[test]
    fn test_load_input_none_reports_required_field() {
        let processor = processor();
        let err = processor.load_input(&Value::Null).unwrap_err();
        assert!(matches!(err, ProcessError::InputValidation(_)));

        let error = processor.get_validation_error(&Value::Null);
        assert_eq!(error.details["first_name"], vec![messages::MISSING]);
    }

    #[test]
    fn test_load_input_wrong_shape() {
        let processor = processor();
        let err = processor.load_input(&json!("")).unwrap_err();
        assert!(matches!(err, ProcessError::WrongInputShape { .. }));

        let error = processor.get_validation_error(&json!(""));
        assert_eq!(error.details["_schema"], vec![messages::INVALID_INPUT_TYPE]);
    }

    #[test]
    fn test_dump_output_valid() {
        let dumped = processor()
            .dump_output(&json!({"first_name": "John", "password": "x"}))
            .unwrap();
        assert_eq!(dumped, json!({"first_name": "John"}));
    }

    #[test]
    fn test_dump_output_missing_required_field() {
        let err = processor().dump_output(&json!({"last_name": "Doe"})).unwrap_err();
        match err {
            ProcessError::OutputValidation(error) => {
                assert_eq!(error.message, "Validation error of output data");
                assert_eq!(error.details["first_name"], vec![messages::MISSING]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_dump_output_file_errors() {
        let processor = processor();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "abc").unwrap();

        let both = HapicFile::from_path(&path).with_reader(Cursor::new(b"abc".to_vec()));
        assert!(processor.dump_output_file(both).is_err());
        assert!(processor.dump_output_file(HapicFile::new()).is_err());
        assert!(processor
            .dump_output_file(HapicFile::from_path(dir.path().join("nope.txt")))
            .is_err());
        let no_mimetype = HapicFile::new().with_reader(Cursor::new(b"abc".to_vec()));
        assert!(processor.dump_output_file(no_mimetype).is_err());
    }

    #[test]
    fn test_dump_output_file_returns_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "abc").unwrap();

        let file = processor()
            .dump_output_file(HapicFile::from_path(&path).with_mimetype("text/plain"))
            .unwrap();
        assert_eq!(file.file_path.as_deref(), Some(path.as_path()));
        assert_eq!(file.mimetype.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_set_schema_replaces_binding() {
        let mut processor = processor();
        processor.set_schema(Schema::builder("Empty").build());
        assert_eq!(processor.schema().name(), "Empty");
        assert!(processor.load_input(&json!({})).is_ok());
    }

    #[test]
    fn test_default_factory() {
        let factory = default_processor_factory();
        let processor = factory(Schema::builder("S").field("a", Field::integer()).build());
        assert_eq!(processor.load_input(&json!({"a": "1"})).unwrap(), json!({"a": 1}));
    }
}
