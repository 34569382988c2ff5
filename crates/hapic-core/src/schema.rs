//! Field-level schemas for request validation and response serialization.
//!
//! A [`Schema`] is a named, ordered set of [`Field`]s. Loading validates raw
//! request data and coerces it to the declared types; dumping serializes a
//! handler's return value. Errors are collected for every field rather than
//! stopping at the first one, and nested paths are reported dot-separated
//! (`address.city`, `items.0.name`).
//!
//! # Example
//!
//! ```
//! use hapic_core::schema::{Field, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::builder("UserSchema")
//!     .field("id", Field::integer().required())
//!     .field("name", Field::string().required().min_length(1))
//!     .field("email", Field::string())
//!     .build();
//!
//! let user = schema.load(&json!({"id": "42", "name": "Alice"})).unwrap();
//! assert_eq!(user, json!({"id": 42, "name": "Alice"}));
//!
//! let err = schema.load(&json!({"name": "Alice"})).unwrap_err();
//! assert_eq!(err.details()["id"], vec!["Missing data for required field."]);
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Field path to the list of messages reported for it.
pub type ErrorDetails = IndexMap<String, Vec<String>>;

/// Key used for errors that concern the whole input rather than a field.
pub const SCHEMA_ERROR_KEY: &str = "_schema";

/// Validation messages.
pub mod messages {
    /// A required field is absent.
    pub const MISSING: &str = "Missing data for required field.";
    /// A field is `null` but does not allow it.
    pub const NULL: &str = "Field may not be null.";
    /// The value is not a mapping (or a list, for `many` schemas).
    pub const INVALID_INPUT_TYPE: &str = "Invalid input type.";
    /// Not a string.
    pub const INVALID_STRING: &str = "Not a valid string.";
    /// Not an integer.
    pub const INVALID_INTEGER: &str = "Not a valid integer.";
    /// Not a number.
    pub const INVALID_NUMBER: &str = "Not a valid number.";
    /// Not a boolean.
    pub const INVALID_BOOLEAN: &str = "Not a valid boolean.";
    /// Not an RFC 3339 date-time.
    pub const INVALID_DATETIME: &str = "Not a valid datetime.";
    /// Not a list.
    pub const INVALID_LIST: &str = "Not a valid list.";
    /// Not an uploaded file.
    pub const INVALID_FILE: &str = "Not a valid file.";
}

const TRUTHY: &[&str] = &["t", "true", "on", "y", "yes", "1"];
const FALSY: &[&str] = &["f", "false", "off", "n", "no", "0"];

/// Failure to load a value against a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The input is not mapping-like (or list-like for `many` schemas).
    #[error("invalid input type: expected {expected}, got {found}")]
    WrongShape {
        /// What the schema expected.
        expected: &'static str,
        /// The JSON type that was received.
        found: &'static str,
    },

    /// One or more fields failed validation.
    #[error("{} field(s) failed validation", .0.len())]
    Fields(ErrorDetails),
}

impl LoadError {
    /// Returns the per-field error details.
    ///
    /// A wrong top-level shape is reported under the `_schema` key.
    #[must_use]
    pub fn details(&self) -> ErrorDetails {
        match self {
            Self::WrongShape { .. } => {
                let mut details = ErrorDetails::new();
                details.insert(
                    SCHEMA_ERROR_KEY.to_string(),
                    vec![messages::INVALID_INPUT_TYPE.to_string()],
                );
                details
            }
            Self::Fields(details) => details.clone(),
        }
    }

    /// Returns true if the input was not mapping-like at all.
    #[must_use]
    pub fn is_wrong_shape(&self) -> bool {
        matches!(self, Self::WrongShape { .. })
    }
}

/// The type of a schema field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Floating-point number.
    Number,
    /// Boolean.
    Boolean,
    /// RFC 3339 date-time, kept as its normalized string form.
    DateTime,
    /// Homogeneous list.
    List(Box<Field>),
    /// Nested object (or list of objects when the nested schema is `many`).
    Nested(Arc<Schema>),
    /// Uploaded multipart file.
    File,
    /// Any JSON value, passed through untouched.
    Any,
}

impl FieldKind {
    /// The OpenAPI 2.0 primitive type name for this kind.
    #[must_use]
    pub fn openapi_type(&self) -> &'static str {
        match self {
            Self::String | Self::DateTime => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::List(_) => "array",
            Self::Nested(schema) if schema.is_many() => "array",
            Self::Nested(_) | Self::Any => "object",
            Self::File => "file",
        }
    }
}

/// A single field of a [`Schema`].
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    required: bool,
    allow_none: bool,
    missing: Option<Value>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    description: Option<String>,
}

impl Field {
    /// Creates a field of the given kind.
    #[must_use]
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            allow_none: false,
            missing: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            description: None,
        }
    }

    /// Creates a string field.
    #[must_use]
    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    /// Creates an integer field.
    #[must_use]
    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    /// Creates a number field.
    #[must_use]
    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    /// Creates a boolean field.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    /// Creates a date-time field.
    #[must_use]
    pub fn datetime() -> Self {
        Self::new(FieldKind::DateTime)
    }

    /// Creates a list field whose items follow `item`.
    #[must_use]
    pub fn list(item: Field) -> Self {
        Self::new(FieldKind::List(Box::new(item)))
    }

    /// Creates a nested-object field.
    #[must_use]
    pub fn nested(schema: Arc<Schema>) -> Self {
        Self::new(FieldKind::Nested(schema))
    }

    /// Creates an uploaded-file field.
    #[must_use]
    pub fn file() -> Self {
        Self::new(FieldKind::File)
    }

    /// Creates a field accepting any value.
    #[must_use]
    pub fn any() -> Self {
        Self::new(FieldKind::Any)
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Accepts `null` for this field.
    #[must_use]
    pub fn allow_none(mut self) -> Self {
        self.allow_none = true;
        self
    }

    /// Value used when the field is absent from loaded input.
    #[must_use]
    pub fn missing(mut self, default: impl Into<Value>) -> Self {
        self.missing = Some(default.into());
        self
    }

    /// Minimum length for strings and lists.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    /// Maximum length for strings and lists.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Inclusive lower bound for integers and numbers.
    #[must_use]
    pub fn minimum(mut self, min: impl Into<f64>) -> Self {
        self.minimum = Some(min.into());
        self
    }

    /// Inclusive upper bound for integers and numbers.
    #[must_use]
    pub fn maximum(mut self, max: impl Into<f64>) -> Self {
        self.maximum = Some(max.into());
        self
    }

    /// Human-readable description, used in generated documentation.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the field kind.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Returns whether the field is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns whether `null` is accepted.
    #[must_use]
    pub fn allows_none(&self) -> bool {
        self.allow_none
    }

    /// Returns the load default, if any.
    #[must_use]
    pub fn missing_value(&self) -> Option<&Value> {
        self.missing.as_ref()
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn load_value(&self, value: &Value, path: &str, errors: &mut ErrorDetails) -> Option<Value> {
        if value.is_null() {
            if self.allow_none {
                return Some(Value::Null);
            }
            push_error(errors, path, messages::NULL);
            return None;
        }

        let loaded = match &self.kind {
            FieldKind::List(item) => return self.load_list(item, value, path, errors),
            FieldKind::Nested(schema) => return schema.load_nested(value, path, errors),
            kind => coerce(kind, value),
        };

        match loaded.and_then(|v| self.check_bounds(&v).map(|()| v)) {
            Ok(v) => Some(v),
            Err(message) => {
                push_error(errors, path, message);
                None
            }
        }
    }

    fn load_list(
        &self,
        item: &Field,
        value: &Value,
        path: &str,
        errors: &mut ErrorDetails,
    ) -> Option<Value> {
        let Some(items) = value.as_array() else {
            push_error(errors, path, messages::INVALID_LIST);
            return None;
        };

        let mut loaded = Vec::with_capacity(items.len());
        let mut failed = false;
        for (idx, raw) in items.iter().enumerate() {
            match item.load_value(raw, &join_path(path, &idx.to_string()), errors) {
                Some(v) => loaded.push(v),
                None => failed = true,
            }
        }
        if failed {
            return None;
        }

        let loaded = Value::Array(loaded);
        match self.check_bounds(&loaded) {
            Ok(()) => Some(loaded),
            Err(message) => {
                push_error(errors, path, message);
                None
            }
        }
    }

    fn check_bounds(&self, value: &Value) -> Result<(), String> {
        let len = match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        };
        if let Some(len) = len {
            if let Some(min) = self.min_length {
                if len < min {
                    return Err(format!("Shorter than minimum length {}.", min));
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    return Err(format!("Longer than maximum length {}.", max));
                }
            }
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.minimum {
                if n < min {
                    return Err(format!(
                        "Must be greater than or equal to {}.",
                        format_bound(min)
                    ));
                }
            }
            if let Some(max) = self.maximum {
                if n > max {
                    return Err(format!("Must be less than or equal to {}.", format_bound(max)));
                }
            }
        }

        Ok(())
    }

    /// Serializes a value, returning `None` when it cannot be represented.
    fn dump_value(&self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        match &self.kind {
            FieldKind::String => match value {
                Value::String(s) => Some(Value::String(s.clone())),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            },
            FieldKind::List(item) => value
                .as_array()?
                .iter()
                .map(|v| item.dump_value(v))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            FieldKind::Nested(schema) => schema.dump(value).ok(),
            FieldKind::File | FieldKind::Any => Some(value.clone()),
            kind => coerce(kind, value).ok(),
        }
    }

    fn to_json_schema(&self) -> Value {
        let mut out = match &self.kind {
            FieldKind::Integer => json!({"type": "integer", "format": "int64"}),
            FieldKind::Number => json!({"type": "number"}),
            FieldKind::Boolean => json!({"type": "boolean"}),
            FieldKind::String => json!({"type": "string"}),
            FieldKind::DateTime => json!({"type": "string", "format": "date-time"}),
            FieldKind::List(item) => json!({"type": "array", "items": item.to_json_schema()}),
            FieldKind::Nested(schema) => schema.reference(),
            FieldKind::File => json!({"type": "file"}),
            FieldKind::Any => json!({}),
        };

        if let Value::Object(map) = &mut out {
            if let Some(min) = self.min_length {
                let key = if matches!(self.kind, FieldKind::List(_)) { "minItems" } else { "minLength" };
                map.insert(key.to_string(), json!(min));
            }
            if let Some(max) = self.max_length {
                let key = if matches!(self.kind, FieldKind::List(_)) { "maxItems" } else { "maxLength" };
                map.insert(key.to_string(), json!(max));
            }
            if let Some(min) = self.minimum {
                map.insert("minimum".to_string(), json!(min));
            }
            if let Some(max) = self.maximum {
                map.insert("maximum".to_string(), json!(max));
            }
            if let Some(default) = &self.missing {
                map.insert("default".to_string(), default.clone());
            }
            if let Some(description) = &self.description {
                map.insert("description".to_string(), json!(description));
            }
            if self.allow_none {
                map.insert("x-nullable".to_string(), json!(true));
            }
        }
        out
    }
}

/// A named, ordered set of fields.
///
/// Schemas are shared behind an [`Arc`]; every decorator referencing the
/// same schema points at the same instance, and documentation emits one
/// definition per schema name.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: IndexMap<String, Field>,
    many: bool,
    description: Option<String>,
}

impl Schema {
    /// Creates a new schema builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Returns the schema name, used as its documentation definition name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &IndexMap<String, Field> {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Returns true if the schema describes a list of objects.
    #[must_use]
    pub fn is_many(&self) -> bool {
        self.many
    }

    /// Returns the schema description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns a copy of this schema that loads and dumps lists of objects.
    #[must_use]
    pub fn as_many(&self) -> Arc<Self> {
        Arc::new(Self {
            many: true,
            ..self.clone()
        })
    }

    /// Validates and coerces raw input.
    ///
    /// `null` is treated as an empty mapping (or an empty list for `many`
    /// schemas). Fields not declared by the schema are dropped; absent fields
    /// with a `missing` default are filled in.
    pub fn load(&self, raw: &Value) -> Result<Value, LoadError> {
        let mut errors = ErrorDetails::new();
        let loaded = match (raw, self.many) {
            (Value::Null, false) => Value::Object(self.load_object(&Map::new(), "", &mut errors)),
            (Value::Object(obj), false) => Value::Object(self.load_object(obj, "", &mut errors)),
            (Value::Null, true) => Value::Array(Vec::new()),
            (Value::Array(items), true) => Value::Array(self.load_items(items, "", &mut errors)),
            (other, many) => {
                return Err(LoadError::WrongShape {
                    expected: if many { "array" } else { "object" },
                    found: value_type_name(other),
                })
            }
        };

        if errors.is_empty() {
            Ok(loaded)
        } else {
            Err(LoadError::Fields(errors))
        }
    }

    /// Serializes a value against the schema.
    ///
    /// Undeclared fields are dropped, and so are declared fields whose value
    /// cannot be represented as the field type. Callers re-validate the
    /// result with [`Schema::load`] to detect missing required output.
    pub fn dump(&self, value: &Value) -> Result<Value, LoadError> {
        match (value, self.many) {
            (Value::Object(obj), false) => Ok(Value::Object(self.dump_object(obj))),
            (Value::Array(items), true) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Object(obj) => Value::Object(self.dump_object(obj)),
                        other => other.clone(),
                    })
                    .collect(),
            )),
            (other, many) => Err(LoadError::WrongShape {
                expected: if many { "array" } else { "object" },
                found: value_type_name(other),
            }),
        }
    }

    /// Returns every schema nested in this one, depth first, without duplicates.
    #[must_use]
    pub fn nested_schemas(&self) -> Vec<Arc<Schema>> {
        let mut found = Vec::new();
        self.collect_nested(&mut found);
        found
    }

    /// Returns the JSON-schema definition of a single object of this schema.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.to_json_schema()))
            .collect();
        let required: Vec<&String> = self
            .fields
            .iter()
            .filter(|(_, field)| field.required)
            .map(|(name, _)| name)
            .collect();

        let mut definition = json!({"type": "object", "properties": properties});
        if !required.is_empty() {
            definition["required"] = json!(required);
        }
        if let Some(description) = &self.description {
            definition["description"] = json!(description);
        }
        definition
    }

    /// Returns a `$ref` to this schema's definition, wrapped in an array for
    /// `many` schemas.
    #[must_use]
    pub fn reference(&self) -> Value {
        let reference = json!({"$ref": format!("#/definitions/{}", self.name)});
        if self.many {
            json!({"type": "array", "items": reference})
        } else {
            reference
        }
    }

    fn load_object(
        &self,
        obj: &Map<String, Value>,
        prefix: &str,
        errors: &mut ErrorDetails,
    ) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, field) in &self.fields {
            let path = join_path(prefix, name);
            match obj.get(name) {
                Some(raw) => {
                    if let Some(v) = field.load_value(raw, &path, errors) {
                        out.insert(name.clone(), v);
                    }
                }
                None => {
                    if let Some(default) = &field.missing {
                        out.insert(name.clone(), default.clone());
                    } else if field.required {
                        push_error(errors, &path, messages::MISSING);
                    }
                }
            }
        }
        out
    }

    fn load_items(&self, items: &[Value], prefix: &str, errors: &mut ErrorDetails) -> Vec<Value> {
        let mut out = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let path = join_path(prefix, &idx.to_string());
            match item {
                Value::Object(obj) => out.push(Value::Object(self.load_object(obj, &path, errors))),
                _ => push_error(errors, &path, messages::INVALID_INPUT_TYPE),
            }
        }
        out
    }

    fn load_nested(&self, value: &Value, path: &str, errors: &mut ErrorDetails) -> Option<Value> {
        let before = errors.len();
        let loaded = match (value, self.many) {
            (Value::Object(obj), false) => Value::Object(self.load_object(obj, path, errors)),
            (Value::Array(items), true) => Value::Array(self.load_items(items, path, errors)),
            _ => {
                push_error(errors, path, messages::INVALID_INPUT_TYPE);
                return None;
            }
        };
        (errors.len() == before).then_some(loaded)
    }

    fn dump_object(&self, obj: &Map<String, Value>) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|(name, field)| {
                let dumped = field.dump_value(obj.get(name)?)?;
                Some((name.clone(), dumped))
            })
            .collect()
    }

    fn collect_nested(&self, found: &mut Vec<Arc<Schema>>) {
        for field in self.fields.values() {
            let mut kind = &field.kind;
            while let FieldKind::List(item) = kind {
                kind = &item.kind;
            }
            if let FieldKind::Nested(schema) = kind {
                if !found.iter().any(|s| s.name == schema.name) {
                    found.push(Arc::clone(schema));
                    schema.collect_nested(found);
                }
            }
        }
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: IndexMap<String, Field>,
    many: bool,
    description: Option<String>,
}

impl SchemaBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            many: false,
            description: None,
        }
    }

    /// Adds a field. Re-adding a name replaces the earlier field in place.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Makes the schema describe a list of objects.
    #[must_use]
    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    /// Sets the schema description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builds the schema.
    #[must_use]
    pub fn build(self) -> Arc<Schema> {
        Arc::new(Schema {
            name: self.name,
            fields: self.fields,
            many: self.many,
            description: self.description,
        })
    }
}

fn coerce(kind: &FieldKind, value: &Value) -> Result<Value, String> {
    let coerced = match kind {
        FieldKind::String => value.as_str().map(|s| Value::String(s.to_string())),
        FieldKind::Integer => coerce_integer(value).map(Value::from),
        FieldKind::Number => coerce_number(value).map(Value::from),
        FieldKind::Boolean => coerce_bool(value).map(Value::Bool),
        FieldKind::DateTime => value
            .as_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| Value::String(dt.to_rfc3339())),
        FieldKind::File => value
            .as_object()
            .filter(|obj| obj.contains_key("size"))
            .map(|_| value.clone()),
        FieldKind::Any => Some(value.clone()),
        FieldKind::List(_) | FieldKind::Nested(_) => None,
    };
    coerced.ok_or_else(|| invalid_message(kind).to_string())
}

fn invalid_message(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::String => messages::INVALID_STRING,
        FieldKind::Integer => messages::INVALID_INTEGER,
        FieldKind::Number => messages::INVALID_NUMBER,
        FieldKind::Boolean => messages::INVALID_BOOLEAN,
        FieldKind::DateTime => messages::INVALID_DATETIME,
        FieldKind::List(_) => messages::INVALID_LIST,
        FieldKind::File => messages::INVALID_FILE,
        FieldKind::Nested(_) | FieldKind::Any => messages::INVALID_INPUT_TYPE,
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            if TRUTHY.contains(&s.as_str()) {
                Some(true)
            } else if FALSY.contains(&s.as_str()) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 && bound.abs() < 9.0e15 {
        format!("{}", bound as i64)
    } else {
        bound.to_string()
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn push_error(errors: &mut ErrorDetails, path: &str, message: impl Into<String>) {
    errors.entry(path.to_string()).or_default().push(message.into());
}

/// Returns a human-readable name for a JSON value type.
#[must_use]
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema() -> Arc<Schema> {
        Schema::builder("UserSchema")
            .field("first_name", Field::string().required())
            .field("last_name", Field::string().missing("Doe"))
            .field("age", Field::integer().minimum(0).maximum(150))
            .build()
    }

    #[test]
    fn test_load_valid_input_coerces_types() {
        let loaded = user_schema()
            .load(&json!({"first_name": "John", "age": "42"}))
            .unwrap();
        assert_eq!(
            loaded,
            json!({"first_name": "John", "last_name": "Doe", "age": 42})
        );
    }

    #[test]
    fn test_load_null_is_empty_mapping() {
        let err = user_schema().load(&Value::Null).unwrap_err();
        let details = err.details();
        assert_eq!(details["first_name"], vec![messages::MISSING]);
        assert!(!err.is_wrong_shape());
    }

    #[test]
    fn test_load_string_is_wrong_shape() {
        let err = user_schema().load(&json!("")).unwrap_err();
        assert!(err.is_wrong_shape());
        assert_eq!(err.details()["_schema"], vec![messages::INVALID_INPUT_TYPE]);
    }

    #[test]
    fn test_load_drops_unknown_fields() {
        let loaded = user_schema()
            .load(&json!({"first_name": "John", "admin": true}))
            .unwrap();
        assert!(loaded.get("admin").is_none());
    }

    #[test]
    fn test_load_reports_all_fields() {
        let err = user_schema()
            .load(&json!({"age": "bob", "last_name": null}))
            .unwrap_err();
        let details = err.details();
        assert_eq!(details.len(), 3);
        assert_eq!(details["age"], vec![messages::INVALID_INTEGER]);
        assert_eq!(details["last_name"], vec![messages::NULL]);
        assert_eq!(details["first_name"], vec![messages::MISSING]);
    }

    #[test]
    fn test_range_messages() {
        let err = user_schema()
            .load(&json!({"first_name": "x", "age": -1}))
            .unwrap_err();
        assert_eq!(
            err.details()["age"],
            vec!["Must be greater than or equal to 0."]
        );
    }

    #[test]
    fn test_length_messages() {
        let schema = Schema::builder("Tag")
            .field("label", Field::string().min_length(2).max_length(4))
            .build();
        assert_eq!(
            schema.load(&json!({"label": "a"})).unwrap_err().details()["label"],
            vec!["Shorter than minimum length 2."]
        );
        assert_eq!(
            schema.load(&json!({"label": "abcde"})).unwrap_err().details()["label"],
            vec!["Longer than maximum length 4."]
        );
    }

    #[test]
    fn test_boolean_and_number_coercion() {
        let schema = Schema::builder("Flags")
            .field("active", Field::boolean())
            .field("ratio", Field::number())
            .build();
        let loaded = schema.load(&json!({"active": "yes", "ratio": "0.5"})).unwrap();
        assert_eq!(loaded, json!({"active": true, "ratio": 0.5}));

        let err = schema.load(&json!({"active": "maybe"})).unwrap_err();
        assert_eq!(err.details()["active"], vec![messages::INVALID_BOOLEAN]);
    }

    #[test]
    fn test_integer_rejects_booleans() {
        let schema = Schema::builder("S").field("i", Field::integer()).build();
        let err = schema.load(&json!({"i": true})).unwrap_err();
        assert_eq!(err.details()["i"], vec![messages::INVALID_INTEGER]);
    }

    #[test]
    fn test_datetime_field() {
        let schema = Schema::builder("Event")
            .field("at", Field::datetime().required())
            .build();
        assert!(schema.load(&json!({"at": "2024-01-02T03:04:05Z"})).is_ok());
        assert_eq!(
            schema.load(&json!({"at": "yesterday"})).unwrap_err().details()["at"],
            vec![messages::INVALID_DATETIME]
        );
    }

    #[test]
    fn test_nested_error_paths() {
        let address = Schema::builder("AddressSchema")
            .field("city", Field::string().required())
            .build();
        let schema = Schema::builder("PersonSchema")
            .field("address", Field::nested(address.clone()))
            .field("previous", Field::nested(address.as_many()))
            .build();

        let err = schema
            .load(&json!({"address": {}, "previous": [{"city": "Lyon"}, {}]}))
            .unwrap_err();
        let details = err.details();
        assert_eq!(details["address.city"], vec![messages::MISSING]);
        assert_eq!(details["previous.1.city"], vec![messages::MISSING]);
    }

    #[test]
    fn test_list_items() {
        let schema = Schema::builder("Numbers")
            .field("values", Field::list(Field::integer()).max_length(3))
            .build();
        assert_eq!(
            schema.load(&json!({"values": ["1", 2]})).unwrap(),
            json!({"values": [1, 2]})
        );
        let err = schema.load(&json!({"values": [1, "x"]})).unwrap_err();
        assert_eq!(err.details()["values.1"], vec![messages::INVALID_INTEGER]);
        let err = schema.load(&json!({"values": 3})).unwrap_err();
        assert_eq!(err.details()["values"], vec![messages::INVALID_LIST]);
    }

    #[test]
    fn test_many_schema() {
        let schema = user_schema().as_many();
        assert_eq!(schema.name(), "UserSchema");
        let loaded = schema.load(&json!([{"first_name": "A"}])).unwrap();
        assert_eq!(loaded[0]["first_name"], "A");
        assert!(schema.load(&json!({"first_name": "A"})).unwrap_err().is_wrong_shape());
        let err = schema.load(&json!([{"first_name": "A"}, 5])).unwrap_err();
        assert_eq!(err.details()["1"], vec![messages::INVALID_INPUT_TYPE]);
    }

    #[test]
    fn test_dump_drops_unrepresentable_fields() {
        let schema = Schema::builder("S")
            .field("i", Field::integer().required())
            .field("name", Field::string())
            .build();
        let dumped = schema.dump(&json!({"i": "bob", "name": 7, "extra": 1})).unwrap();
        assert_eq!(dumped, json!({"name": "7"}));
        let err = schema.load(&dumped).unwrap_err();
        assert_eq!(err.details()["i"], vec![messages::MISSING]);
    }

    #[test]
    fn test_json_schema_definition() {
        let definition = user_schema().to_json_schema();
        assert_eq!(definition["type"], "object");
        assert_eq!(definition["required"], json!(["first_name"]));
        assert_eq!(definition["properties"]["age"]["type"], "integer");
        assert_eq!(definition["properties"]["last_name"]["default"], "Doe");
    }

    #[test]
    fn test_reference_for_many() {
        let schema = user_schema();
        assert_eq!(
            schema.reference(),
            json!({"$ref": "#/definitions/UserSchema"})
        );
        assert_eq!(
            schema.as_many().reference(),
            json!({"type": "array", "items": {"$ref": "#/definitions/UserSchema"}})
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_valid_input_loads_unchanged(
            name in "[a-zA-Z]{1,12}",
            age in 0i64..150,
            active: bool,
        ) {
            let schema = Schema::builder("Person")
                .field("name", Field::string().required())
                .field("age", Field::integer().minimum(0).maximum(150))
                .field("active", Field::boolean())
                .build();
            let raw = json!({"name": name, "age": age, "active": active});
            proptest::prop_assert_eq!(schema.load(&raw).unwrap(), raw);
        }

        #[test]
        fn prop_stringly_integers_are_coerced(age in 0i64..150) {
            let schema = Schema::builder("Person").field("age", Field::integer()).build();
            let loaded = schema.load(&json!({"age": age.to_string()})).unwrap();
            proptest::prop_assert_eq!(loaded, json!({"age": age}));
        }

        #[test]
        fn prop_missing_required_field_is_reported(other in "[a-z]{1,8}") {
            let schema = Schema::builder("Person")
                .field("name", Field::string().required())
                .build();
            let err = schema.load(&json!({"nickname": other})).unwrap_err();
            proptest::prop_assert!(!err.details()["name"].is_empty());
        }
    }

    #[test]
    fn test_nested_schemas_are_collected_once() {
        let tag = Schema::builder("TagSchema").field("label", Field::string()).build();
        let post = Schema::builder("PostSchema")
            .field("tags", Field::list(Field::nested(tag.clone())))
            .field("main_tag", Field::nested(tag))
            .build();
        let nested = post.nested_schemas();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name(), "TagSchema");
    }
}
