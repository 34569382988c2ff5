//! Controller descriptions and the controller registry.
//!
//! A [`ControllerDescription`] records which decorators, with which schemas
//! and status codes, were applied to one controller. The pipeline executes
//! from it and the doc generator reads it. Descriptions are registered once
//! at startup in a [`ControllerRegistry`] and are read-only afterwards.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::RequestParameters;
use crate::exception::ExceptionMapper;
use crate::processor::Processor;
use crate::schema::Schema;

/// Identity of a decorated controller.
///
/// Context adapters store the token next to the route so that a controller
/// can be located in the framework's route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerToken(Uuid);

impl ControllerToken {
    /// Creates a new unique token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ControllerToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ControllerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A framework route: path template in the framework's own syntax and method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteRepresentation {
    /// Path template, e.g. `/users/:id`.
    pub rule: String,
    /// Upper-case HTTP method.
    pub method: String,
}

impl RouteRepresentation {
    /// Creates a route representation.
    #[must_use]
    pub fn new(rule: impl Into<String>, method: impl AsRef<str>) -> Self {
        Self {
            rule: rule.into(),
            method: method.as_ref().to_ascii_uppercase(),
        }
    }
}

/// Documentation metadata for a controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiDoc {
    /// One-line operation description.
    pub description: Option<String>,
    /// Operation tags.
    pub tags: Vec<String>,
    /// Excludes the controller from generated documentation.
    pub disabled: bool,
}

impl ApiDoc {
    /// Creates empty documentation metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Excludes the controller from documentation.
    #[must_use]
    pub fn disable(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// The request slice an input stage validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSlice {
    /// Path parameters.
    Path,
    /// Query string.
    Query,
    /// Headers.
    Headers,
    /// Decoded body.
    Body,
    /// Form fields.
    Forms,
    /// Multipart files, as upload metadata.
    Files,
}

impl InputSlice {
    /// Every slice, in default execution order.
    pub const ALL: [Self; 6] = [
        Self::Path,
        Self::Query,
        Self::Headers,
        Self::Body,
        Self::Forms,
        Self::Files,
    ];

    /// Slice name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Headers => "headers",
            Self::Body => "body",
            Self::Forms => "forms",
            Self::Files => "files",
        }
    }

    /// Extracts the raw value this slice feeds to its processor.
    #[must_use]
    pub fn extract(self, params: &RequestParameters, as_list: &[String]) -> serde_json::Value {
        match self {
            Self::Path => params.path_value(),
            Self::Query => params.query_value(as_list),
            Self::Headers => params.headers_value(),
            Self::Body => params.body.clone(),
            Self::Forms => params.form_value(as_list),
            Self::Files => params.files_value(),
        }
    }
}

/// An input stage: one request slice validated by one processor.
#[derive(Debug, Clone)]
pub struct InputDescription {
    /// Processor loading the slice.
    pub processor: Arc<dyn Processor>,
    /// Status used when validation fails and no error mapping applies.
    pub error_http_code: StatusCode,
    /// Fields collecting every value of a repeated key (query and forms).
    pub as_list: Vec<String>,
}

impl InputDescription {
    /// Returns the schema bound to the processor.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        self.processor.schema()
    }
}

/// The `output_body` stage.
#[derive(Debug, Clone)]
pub struct OutputBodyDescription {
    /// Processor dumping the return value.
    pub processor: Arc<dyn Processor>,
    /// Status of successful responses.
    pub default_http_code: StatusCode,
}

impl OutputBodyDescription {
    /// Returns the schema bound to the processor.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        self.processor.schema()
    }
}

/// The `output_stream` stage.
#[derive(Debug, Clone)]
pub struct OutputStreamDescription {
    /// Processor dumping each item.
    pub processor: Arc<dyn Processor>,
    /// Status of the streamed response.
    pub default_http_code: StatusCode,
    /// Skip invalid items instead of ending the stream.
    pub ignore_on_error: bool,
}

impl OutputStreamDescription {
    /// Returns the per-item schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        self.processor.schema()
    }
}

/// The `output_file` stage.
#[derive(Debug, Clone)]
pub struct OutputFileDescription {
    /// Processor checking the returned file.
    pub processor: Arc<dyn Processor>,
    /// Content types the controller may produce.
    pub output_types: Vec<String>,
    /// Status of successful responses.
    pub default_http_code: StatusCode,
}

/// Everything declared on one controller.
///
/// Single-valued stages are overwritten when declared twice.
#[derive(Debug, Clone, Default)]
pub struct ControllerDescription {
    /// Path parameters.
    pub input_path: Option<InputDescription>,
    /// Query parameters.
    pub input_query: Option<InputDescription>,
    /// Request body.
    pub input_body: Option<InputDescription>,
    /// Form fields.
    pub input_forms: Option<InputDescription>,
    /// Multipart files.
    pub input_files: Option<InputDescription>,
    /// Request headers.
    pub input_headers: Option<InputDescription>,
    /// Single response body.
    pub output_body: Option<OutputBodyDescription>,
    /// Newline-delimited streamed response.
    pub output_stream: Option<OutputStreamDescription>,
    /// File response.
    pub output_file: Option<OutputFileDescription>,
    /// Error table.
    pub errors: ExceptionMapper,
    /// Documentation metadata.
    pub api_doc: Option<ApiDoc>,
    /// Slices in the order their stages were declared.
    pub input_order: Vec<InputSlice>,
}

impl ControllerDescription {
    /// Sets the stage of `slice`.
    ///
    /// A first declaration appends the slice to the execution order; a
    /// repeated one replaces the stage and keeps its position.
    pub fn set_input(&mut self, slice: InputSlice, input: InputDescription) {
        *self.input_slot(slice) = Some(input);
        if !self.input_order.contains(&slice) {
            self.input_order.push(slice);
        }
    }

    fn input_slot(&mut self, slice: InputSlice) -> &mut Option<InputDescription> {
        match slice {
            InputSlice::Path => &mut self.input_path,
            InputSlice::Query => &mut self.input_query,
            InputSlice::Headers => &mut self.input_headers,
            InputSlice::Body => &mut self.input_body,
            InputSlice::Forms => &mut self.input_forms,
            InputSlice::Files => &mut self.input_files,
        }
    }

    /// Returns the stage of `slice`, if declared.
    #[must_use]
    pub fn input(&self, slice: InputSlice) -> Option<&InputDescription> {
        match slice {
            InputSlice::Path => self.input_path.as_ref(),
            InputSlice::Query => self.input_query.as_ref(),
            InputSlice::Headers => self.input_headers.as_ref(),
            InputSlice::Body => self.input_body.as_ref(),
            InputSlice::Forms => self.input_forms.as_ref(),
            InputSlice::Files => self.input_files.as_ref(),
        }
    }

    /// Input stages in execution order, paired with their slices.
    ///
    /// Declared stages run in declaration order. Stages assigned directly to
    /// a field, without [`set_input`](Self::set_input), follow them in
    /// path, query, headers, body, forms, files order.
    pub fn inputs(&self) -> impl Iterator<Item = (InputSlice, &InputDescription)> {
        let unordered = InputSlice::ALL
            .into_iter()
            .filter(|slice| !self.input_order.contains(slice));
        self.input_order
            .iter()
            .copied()
            .chain(unordered)
            .filter_map(|slice| self.input(slice).map(|input| (slice, input)))
    }

    /// Returns true unless documentation was disabled for the controller.
    #[must_use]
    pub fn is_documented(&self) -> bool {
        !self.api_doc.as_ref().is_some_and(|doc| doc.disabled)
    }
}

/// A controller name, its token and its description.
#[derive(Debug, Clone)]
pub struct DecoratedController {
    /// Controller name, used as the operation id.
    pub name: String,
    /// Identity used to find the controller's route.
    pub token: ControllerToken,
    /// What was declared on the controller.
    pub description: Arc<ControllerDescription>,
}

impl DecoratedController {
    /// Creates a decorated controller with a fresh token.
    #[must_use]
    pub fn new(name: impl Into<String>, description: ControllerDescription) -> Self {
        Self {
            name: name.into(),
            token: ControllerToken::new(),
            description: Arc::new(description),
        }
    }
}

/// Registry of decorated controllers, filled at startup.
#[derive(Debug, Default)]
pub struct ControllerRegistry {
    controllers: RwLock<Vec<DecoratedController>>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller.
    pub fn register(&self, controller: DecoratedController) {
        tracing::debug!(
            controller = %controller.name,
            token = %controller.token,
            "registered controller"
        );
        self.controllers.write().push(controller);
    }

    /// Returns a snapshot of every registered controller.
    #[must_use]
    pub fn controllers(&self) -> Vec<DecoratedController> {
        self.controllers.read().clone()
    }

    /// Looks up a controller by token.
    #[must_use]
    pub fn get(&self, token: ControllerToken) -> Option<DecoratedController> {
        self.controllers
            .read()
            .iter()
            .find(|c| c.token == token)
            .cloned()
    }

    /// Returns the number of registered controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::SchemaProcessor;
    use crate::schema::Field;

    fn input(name: &str) -> InputDescription {
        InputDescription {
            processor: Arc::new(SchemaProcessor::new(
                Schema::builder(name).field("id", Field::integer()).build(),
            )),
            error_http_code: StatusCode::BAD_REQUEST,
            as_list: Vec::new(),
        }
    }

    #[test]
    fn test_token_uniqueness() {
        assert_ne!(ControllerToken::new(), ControllerToken::new());
    }

    #[test]
    fn test_route_method_uppercased() {
        let route = RouteRepresentation::new("/users/:id", "get");
        assert_eq!(route.method, "GET");
    }

    #[test]
    fn test_inputs_in_execution_order() {
        let description = ControllerDescription {
            input_body: Some(input("Body")),
            input_path: Some(input("Path")),
            input_query: Some(input("Query")),
            ..ControllerDescription::default()
        };
        let slices: Vec<_> = description.inputs().map(|(slice, _)| slice.name()).collect();
        assert_eq!(slices, vec!["path", "query", "body"]);
        assert_eq!(description.input_body.unwrap().schema().name(), "Body");
    }

    #[test]
    fn test_inputs_in_declaration_order() {
        let mut description = ControllerDescription::default();
        description.set_input(InputSlice::Body, input("Body"));
        description.set_input(InputSlice::Path, input("Path"));
        description.set_input(InputSlice::Body, input("OtherBody"));
        description.input_query = Some(input("Query"));

        let stages: Vec<_> = description
            .inputs()
            .map(|(slice, input)| (slice.name(), input.schema().name().to_string()))
            .collect();
        assert_eq!(
            stages,
            vec![
                ("body", "OtherBody".to_string()),
                ("path", "Path".to_string()),
                ("query", "Query".to_string()),
            ]
        );
    }

    #[test]
    fn test_slice_extract() {
        let params = RequestParameters::new()
            .with_path("id", "7")
            .with_query("tag", "a")
            .with_query("tag", "b")
            .with_header("X-Token", "t");
        assert_eq!(
            InputSlice::Path.extract(&params, &[]),
            serde_json::json!({"id": "7"})
        );
        assert_eq!(
            InputSlice::Query.extract(&params, &["tag".to_string()]),
            serde_json::json!({"tag": ["a", "b"]})
        );
        assert_eq!(
            InputSlice::Headers.extract(&params, &[]),
            serde_json::json!({"x-token": "t"})
        );
        assert!(InputSlice::Body.extract(&params, &[]).is_null());
    }

    #[test]
    fn test_is_documented() {
        let mut description = ControllerDescription::default();
        assert!(description.is_documented());
        description.api_doc = Some(ApiDoc::new().description("List users"));
        assert!(description.is_documented());
        description.api_doc = Some(ApiDoc::new().disable());
        assert!(!description.is_documented());
    }

    #[test]
    fn test_registry() {
        let registry = ControllerRegistry::new();
        assert!(registry.is_empty());
        let controller = DecoratedController::new("get_user", ControllerDescription::default());
        let token = controller.token;
        registry.register(controller);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(token).unwrap().name, "get_user");
        assert!(registry.get(ControllerToken::new()).is_none());
    }
}
