//! OpenAPI 2.0 document types and generation.
//!
//! The types follow the Swagger 2.0 specification:
//! <https://swagger.io/specification/v2/>

use std::sync::{Arc, OnceLock};

use http::StatusCode;
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use hapic_core::{
    Context, ControllerDescription, DecoratedController, Field, FieldKind, InputDescription,
    RouteRepresentation, Schema,
};

use crate::error::{DocsError, DocsResult};

/// OpenAPI document root object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApi {
    /// Specification version, always "2.0".
    pub swagger: String,
    /// API metadata.
    pub info: Info,
    /// Host (name or IP) serving the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Base path, relative to the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "basePath")]
    pub base_path: Option<String>,
    /// Transfer protocols.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,
    /// API paths and operations.
    pub paths: IndexMap<String, PathItem>,
    /// Schema definitions by name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub definitions: IndexMap<String, Value>,
    /// Tags used by operations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// API metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// API version.
    pub version: String,
    /// API description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Contact information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    /// License information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

/// Contact information.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Contact {
    /// Contact name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// License information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    /// License name.
    pub name: String,
    /// License URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Operations available on one path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// PATCH operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    /// Returns the slot for an HTTP method, or `None` for unknown methods.
    fn slot(&mut self, method: &str) -> Option<&mut Option<Operation>> {
        match method {
            "GET" => Some(&mut self.get),
            "PUT" => Some(&mut self.put),
            "POST" => Some(&mut self.post),
            "DELETE" => Some(&mut self.delete),
            "OPTIONS" => Some(&mut self.options),
            "HEAD" => Some(&mut self.head),
            "PATCH" => Some(&mut self.patch),
            _ => None,
        }
    }

    /// Returns the number of operations on this path.
    #[must_use]
    pub fn len(&self) -> usize {
        [
            &self.get,
            &self.put,
            &self.post,
            &self.delete,
            &self.options,
            &self.head,
            &self.patch,
        ]
        .iter()
        .filter(|op| op.is_some())
        .count()
    }

    /// Returns true if no operation is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An API operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation identifier (the controller name).
    #[serde(rename = "operationId")]
    pub operation_id: String,
    /// Full description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags for grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Accepted request media types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    /// Produced response media types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    /// Parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Responses by status code.
    pub responses: IndexMap<String, Response>,
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterIn {
    /// Query string parameter.
    Query,
    /// URL path parameter.
    Path,
    /// HTTP header.
    Header,
    /// Request body.
    Body,
    /// Form field (urlencoded or multipart).
    FormData,
}

/// An operation parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter location.
    #[serde(rename = "in")]
    pub location: ParameterIn,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Primitive type, for non-body parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub param_type: Option<String>,
    /// Type format (e.g. "date-time").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Item type, for array parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
    /// Array serialization, "multi" for repeated keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "collectionFormat")]
    pub collection_format: Option<String>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Body schema, for body parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl Parameter {
    fn new(name: impl Into<String>, location: ParameterIn) -> Self {
        Self {
            name: name.into(),
            location,
            description: None,
            required: false,
            param_type: None,
            format: None,
            items: None,
            collection_format: None,
            default: None,
            schema: None,
        }
    }

    /// A typed parameter built from a schema field.
    fn from_field(name: &str, field: &Field, location: ParameterIn) -> Self {
        let mut param = Self::new(name, location);
        param.required = field.is_required();
        param.description = field.get_description().map(str::to_string);
        param.default = field.missing_value().cloned();

        match field.kind() {
            FieldKind::List(item) => {
                param.param_type = Some("array".to_string());
                param.items = Some(json!({"type": primitive_type(item.kind())}));
                if matches!(location, ParameterIn::Query | ParameterIn::FormData) {
                    param.collection_format = Some("multi".to_string());
                }
            }
            FieldKind::DateTime => {
                param.param_type = Some("string".to_string());
                param.format = Some("date-time".to_string());
            }
            kind => param.param_type = Some(primitive_type(kind).to_string()),
        }
        param
    }
}

/// Parameters can only carry primitive types.
fn primitive_type(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Nested(_) | FieldKind::Any => "string",
        kind => kind.openapi_type(),
    }
}

/// Response definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Description (required).
    pub description: String,
    /// Response body schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// API tag for grouping operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
}

/// Generator turning decorated controllers into an OpenAPI document.
#[derive(Debug, Clone)]
pub struct DocGenerator {
    title: String,
    version: String,
    description: Option<String>,
    host: Option<String>,
    base_path: Option<String>,
    schemes: Vec<String>,
    contact: Option<Contact>,
    license: Option<License>,
}

impl Default for DocGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DocGenerator {
    /// Create a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: "API Documentation".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            host: None,
            base_path: None,
            schemes: Vec::new(),
            contact: None,
            license: None,
        }
    }

    /// Set the API title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the API description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the host serving the API.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the base path.
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Add a transfer protocol ("http", "https").
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.schemes.push(scheme.into());
        self
    }

    /// Set contact information.
    #[must_use]
    pub fn contact(mut self, contact: Contact) -> Self {
        self.contact = Some(contact);
        self
    }

    /// Set license information.
    #[must_use]
    pub fn license(mut self, name: impl Into<String>, url: Option<String>) -> Self {
        self.license = Some(License {
            name: name.into(),
            url,
        });
        self
    }

    /// Generate the document.
    ///
    /// `error_schema` is the schema of error responses, referenced by every
    /// `handle_exception` entry. Fails when a controller's route cannot be
    /// found, or when the framework has no routes at all.
    pub fn generate<C: Context>(
        &self,
        controllers: &[DecoratedController],
        context: &C,
        error_schema: &Arc<Schema>,
    ) -> DocsResult<OpenApi> {
        let documented: Vec<&DecoratedController> = controllers
            .iter()
            .filter(|c| c.description.is_documented())
            .collect();

        let definitions = collect_definitions(&documented, error_schema);

        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        let mut tags: IndexSet<String> = IndexSet::new();

        for controller in documented {
            let route = context.find_route(controller)?;
            let swagger_path = context.get_swagger_path(&route.rule);
            let operation = build_operation(controller, &swagger_path, error_schema);
            tags.extend(operation.tags.iter().cloned());

            let path_item = paths.entry(swagger_path.clone()).or_default();
            let slot = path_item
                .slot(&route.method)
                .ok_or_else(|| DocsError::InvalidOperation {
                    operation_id: controller.name.clone(),
                    reason: format!("unknown HTTP method: {}", route.method),
                })?;
            if slot.is_some() {
                tracing::warn!(
                    path = %swagger_path,
                    method = %route.method,
                    controller = %controller.name,
                    "operation documented twice, keeping the last one"
                );
            }
            *slot = Some(operation);
            log_route(&route, controller);
        }

        tracing::info!(
            paths = paths.len(),
            definitions = definitions.len(),
            "generated OpenAPI document"
        );

        Ok(OpenApi {
            swagger: "2.0".to_string(),
            info: Info {
                title: self.title.clone(),
                version: self.version.clone(),
                description: self.description.clone(),
                contact: self.contact.clone(),
                license: self.license.clone(),
            },
            host: self.host.clone(),
            base_path: self.base_path.clone(),
            schemes: self.schemes.clone(),
            paths,
            definitions,
            tags: tags.into_iter().map(|name| Tag { name }).collect(),
        })
    }

    /// Generate the document as pretty-printed JSON.
    pub fn generate_json<C: Context>(
        &self,
        controllers: &[DecoratedController],
        context: &C,
        error_schema: &Arc<Schema>,
    ) -> DocsResult<String> {
        let spec = self.generate(controllers, context, error_schema)?;
        serde_json::to_string_pretty(&spec).map_err(DocsError::from)
    }
}

fn log_route(route: &RouteRepresentation, controller: &DecoratedController) {
    tracing::debug!(
        rule = %route.rule,
        method = %route.method,
        controller = %controller.name,
        "documented route"
    );
}

/// Schemas referenced by documented controllers, one definition per name.
fn collect_definitions(
    controllers: &[&DecoratedController],
    error_schema: &Arc<Schema>,
) -> IndexMap<String, Value> {
    let mut definitions: IndexMap<String, Value> = IndexMap::new();

    for controller in controllers {
        for schema in referenced_schemas(&controller.description, error_schema) {
            let nested = schema.nested_schemas();
            for schema in std::iter::once(&schema).chain(nested.iter()) {
                let definition = schema.to_json_schema();
                match definitions.get(schema.name()) {
                    Some(existing) if *existing != definition => tracing::warn!(
                        schema = schema.name(),
                        "conflicting schemas share a name, keeping the first definition"
                    ),
                    Some(_) => {}
                    None => {
                        definitions.insert(schema.name().to_string(), definition);
                    }
                }
            }
        }
    }
    definitions
}

fn referenced_schemas(
    description: &ControllerDescription,
    error_schema: &Arc<Schema>,
) -> Vec<Arc<Schema>> {
    let mut schemas: Vec<Arc<Schema>> = Vec::new();
    if let Some(input) = &description.input_body {
        schemas.push(Arc::clone(input.schema()));
    }
    if let Some(input) = &description.input_forms {
        schemas.push(Arc::clone(input.schema()));
    }
    if let Some(output) = &description.output_body {
        schemas.push(Arc::clone(output.schema()));
    }
    if let Some(output) = &description.output_stream {
        schemas.push(Arc::clone(output.schema()));
    }
    if !description.errors.is_empty() {
        schemas.push(Arc::clone(error_schema));
    }
    schemas
}

fn build_operation(
    controller: &DecoratedController,
    swagger_path: &str,
    error_schema: &Arc<Schema>,
) -> Operation {
    let description = &controller.description;
    let api_doc = description.api_doc.clone().unwrap_or_default();

    Operation {
        operation_id: controller.name.clone(),
        description: api_doc.description,
        tags: api_doc.tags,
        consumes: consumes(description),
        produces: produces(description),
        parameters: build_parameters(description, swagger_path),
        responses: build_responses(description, error_schema),
    }
}

fn field_parameters(input: &InputDescription, location: ParameterIn) -> Vec<Parameter> {
    input
        .schema()
        .fields()
        .iter()
        .map(|(name, field)| Parameter::from_field(name, field, location))
        .collect()
}

fn build_parameters(description: &ControllerDescription, swagger_path: &str) -> Vec<Parameter> {
    let mut parameters = Vec::new();

    if let Some(input) = &description.input_path {
        parameters.extend(field_parameters(input, ParameterIn::Path));
    }
    // Path segments without a schema field are still required parameters.
    for name in extract_path_parameters(swagger_path) {
        let declared = parameters
            .iter()
            .any(|p| p.location == ParameterIn::Path && p.name == name);
        if !declared {
            let mut param = Parameter::new(name, ParameterIn::Path);
            param.required = true;
            param.param_type = Some("string".to_string());
            parameters.push(param);
        }
    }

    if let Some(input) = &description.input_query {
        parameters.extend(field_parameters(input, ParameterIn::Query));
    }
    if let Some(input) = &description.input_headers {
        parameters.extend(field_parameters(input, ParameterIn::Header));
    }
    if let Some(input) = &description.input_body {
        let mut param = Parameter::new("body", ParameterIn::Body);
        param.required = true;
        param.schema = Some(input.schema().reference());
        parameters.push(param);
    }
    if let Some(input) = &description.input_forms {
        parameters.extend(field_parameters(input, ParameterIn::FormData));
    }
    if let Some(input) = &description.input_files {
        parameters.extend(input.schema().fields().iter().map(|(name, field)| {
            let mut param = Parameter::new(name.as_str(), ParameterIn::FormData);
            param.required = field.is_required();
            param.description = field.get_description().map(str::to_string);
            param.param_type = Some("file".to_string());
            param
        }));
    }

    parameters
}

fn build_responses(
    description: &ControllerDescription,
    error_schema: &Arc<Schema>,
) -> IndexMap<String, Response> {
    let mut responses = IndexMap::new();

    if let Some(output) = &description.output_body {
        let code = output.default_http_code;
        responses.insert(
            status_key(code),
            Response {
                description: status_key(code),
                schema: (code != StatusCode::NO_CONTENT).then(|| output.schema().reference()),
            },
        );
    }
    if let Some(output) = &description.output_stream {
        let code = output.default_http_code;
        responses.insert(
            status_key(code),
            Response {
                description: status_key(code),
                schema: Some(json!({"type": "array", "items": output.schema().reference()})),
            },
        );
    }
    if let Some(output) = &description.output_file {
        let code = output.default_http_code;
        responses.insert(
            status_key(code),
            Response {
                description: status_key(code),
                schema: Some(json!({"type": "file"})),
            },
        );
    }
    for mapping in description.errors.entries() {
        responses.insert(
            status_key(mapping.status),
            Response {
                description: mapping
                    .description
                    .clone()
                    .unwrap_or_else(|| status_key(mapping.status)),
                schema: Some(error_schema.reference()),
            },
        );
    }

    if responses.is_empty() {
        responses.insert(
            status_key(StatusCode::OK),
            Response {
                description: status_key(StatusCode::OK),
                schema: None,
            },
        );
    }
    responses
}

fn consumes(description: &ControllerDescription) -> Vec<String> {
    let mut consumes = Vec::new();
    if description.input_body.is_some() {
        consumes.push("application/json".to_string());
    }
    if description.input_files.is_some() {
        consumes.push("multipart/form-data".to_string());
    } else if description.input_forms.is_some() {
        consumes.push("application/x-www-form-urlencoded".to_string());
    }
    consumes
}

fn produces(description: &ControllerDescription) -> Vec<String> {
    let mut produces = Vec::new();
    if description.output_body.is_some() || !description.errors.is_empty() {
        produces.push("application/json".to_string());
    }
    if description.output_stream.is_some() {
        produces.push("application/x-ndjson".to_string());
    }
    if let Some(output) = &description.output_file {
        produces.extend(output.output_types.iter().cloned());
    }
    produces
}

fn status_key(code: StatusCode) -> String {
    code.as_u16().to_string()
}

/// Extract path parameter names from a template like `/users/{userId}`.
fn extract_path_parameters(path: &str) -> Vec<String> {
    static PARAM_REGEX: OnceLock<Regex> = OnceLock::new();
    let param_regex = PARAM_REGEX.get_or_init(|| Regex::new(r"\{([^}]+)\}").expect("valid regex"));

    param_regex
        .captures_iter(path)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}
