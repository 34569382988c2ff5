//! Decoration builder and decorated controller execution.
//!
//! [`ControllerBuilder`] collects stage records in declaration order and
//! finalizes into a [`Controller`]. Every invocation runs the same steps:
//!
//! 1. Ask the context adapter for the raw [`RequestParameters`]
//! 2. Validate each declared input slice, short-circuiting on failure
//! 3. Call the handler with the validated [`HapicData`]
//! 4. Map handler errors through the controller's error table
//! 5. Process the reply through the output stage and build the response

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream;
use hapic_core::schema::{ErrorDetails, SCHEMA_ERROR_KEY};
use hapic_core::{
    ApiDoc, Context, ControllerDescription, DecoratedController, ErrorMapping, ErrorMatcher,
    HapicData, HapicError, HapicResult, InputDescription, InputSlice,
    OutputBodyDescription, OutputFileDescription, OutputStreamDescription, ProcessError,
    ProcessValidationError, Processor, ProcessorFactory, RequestParameters, Schema,
};
use http::StatusCode;
use serde_json::Value;
use tracing::Instrument;

use crate::hapic::Hapic;
use crate::reply::Reply;
use crate::stream::ItemEncoder;
use crate::ExecutionMode;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler returns: a reply, or an application error.
pub type HandlerResult<R> = Result<Reply<R>, anyhow::Error>;

type BlockingHandler<C> = Arc<
    dyn Fn(<C as Context>::Request, HapicData) -> HandlerResult<<C as Context>::Response>
        + Send
        + Sync,
>;

type CooperativeHandler<C> = Arc<
    dyn Fn(
            <C as Context>::Request,
            HapicData,
        ) -> BoxFuture<'static, HandlerResult<<C as Context>::Response>>
        + Send
        + Sync,
>;

enum Handler<C: Context> {
    Blocking(BlockingHandler<C>),
    Cooperative(CooperativeHandler<C>),
}

impl<C: Context> Clone for Handler<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Blocking(h) => Self::Blocking(Arc::clone(h)),
            Self::Cooperative(h) => Self::Cooperative(Arc::clone(h)),
        }
    }
}

/// Options of an input decorator.
#[derive(Clone, Default)]
pub struct InputOptions {
    error_http_code: Option<StatusCode>,
    as_list: Vec<String>,
    processor_factory: Option<ProcessorFactory>,
}

impl InputOptions {
    /// Default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of validation error responses for this decorator.
    #[must_use]
    pub fn error_http_code(mut self, code: StatusCode) -> Self {
        self.error_http_code = Some(code);
        self
    }

    /// Fields collecting every value of a repeated key (query and forms).
    #[must_use]
    pub fn as_list<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.as_list.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Processor factory for this decorator only.
    #[must_use]
    pub fn processor_factory(mut self, factory: ProcessorFactory) -> Self {
        self.processor_factory = Some(factory);
        self
    }
}

impl fmt::Debug for InputOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputOptions")
            .field("error_http_code", &self.error_http_code)
            .field("as_list", &self.as_list)
            .field("custom_processor", &self.processor_factory.is_some())
            .finish()
    }
}

/// Options of an output decorator.
#[derive(Clone, Default)]
pub struct OutputOptions {
    default_http_code: Option<StatusCode>,
    ignore_on_error: bool,
    processor_factory: Option<ProcessorFactory>,
}

impl OutputOptions {
    /// Default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of successful responses.
    #[must_use]
    pub fn default_http_code(mut self, code: StatusCode) -> Self {
        self.default_http_code = Some(code);
        self
    }

    /// Skip invalid stream items instead of ending the stream.
    #[must_use]
    pub fn ignore_on_error(mut self, ignore: bool) -> Self {
        self.ignore_on_error = ignore;
        self
    }

    /// Processor factory for this decorator only.
    #[must_use]
    pub fn processor_factory(mut self, factory: ProcessorFactory) -> Self {
        self.processor_factory = Some(factory);
        self
    }
}

impl fmt::Debug for OutputOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputOptions")
            .field("default_http_code", &self.default_http_code)
            .field("ignore_on_error", &self.ignore_on_error)
            .field("custom_processor", &self.processor_factory.is_some())
            .finish()
    }
}

/// Fluent builder declaring the stages of one controller.
///
/// Created by [`Hapic::controller`]. Declaring a single-valued stage twice
/// keeps the last declaration.
///
/// # Example
///
/// ```rust,ignore
/// let get_user = hapic
///     .controller("get_user")
///     .input_path(path_schema)
///     .output_body(user_schema)
///     .handle_exception::<UserNotFound>(StatusCode::NOT_FOUND)
///     .async_handler(|_request, data| async move {
///         let user = find_user(data.path["id"].as_i64())?;
///         Reply::json(&user)
///     })?;
/// ```
pub struct ControllerBuilder<C: Context> {
    hapic: Hapic<C>,
    name: String,
    description: ControllerDescription,
}

impl<C: Context> ControllerBuilder<C> {
    pub(crate) fn new(hapic: Hapic<C>, name: String) -> Self {
        Self {
            hapic,
            name,
            description: ControllerDescription::default(),
        }
    }

    fn processor(
        &self,
        schema: Arc<Schema>,
        factory: Option<&ProcessorFactory>,
    ) -> Arc<dyn Processor> {
        let factory = factory.unwrap_or_else(|| self.hapic.processor_factory());
        Arc::from(factory(schema))
    }

    fn input(&self, schema: Arc<Schema>, options: InputOptions) -> InputDescription {
        InputDescription {
            processor: self.processor(schema, options.processor_factory.as_ref()),
            error_http_code: options
                .error_http_code
                .unwrap_or_else(|| self.hapic.default_error_http_code()),
            as_list: options.as_list,
        }
    }

    /// Validates path parameters.
    #[must_use]
    pub fn input_path(self, schema: Arc<Schema>) -> Self {
        self.input_path_with(schema, InputOptions::new())
    }

    /// Validates path parameters, with options.
    #[must_use]
    pub fn input_path_with(mut self, schema: Arc<Schema>, options: InputOptions) -> Self {
        let input = self.input(schema, options);
        self.description.set_input(InputSlice::Path, input);
        self
    }

    /// Validates the query string.
    #[must_use]
    pub fn input_query(self, schema: Arc<Schema>) -> Self {
        self.input_query_with(schema, InputOptions::new())
    }

    /// Validates the query string, with options.
    #[must_use]
    pub fn input_query_with(mut self, schema: Arc<Schema>, options: InputOptions) -> Self {
        let input = self.input(schema, options);
        self.description.set_input(InputSlice::Query, input);
        self
    }

    /// Validates the request body.
    #[must_use]
    pub fn input_body(self, schema: Arc<Schema>) -> Self {
        self.input_body_with(schema, InputOptions::new())
    }

    /// Validates the request body, with options.
    #[must_use]
    pub fn input_body_with(mut self, schema: Arc<Schema>, options: InputOptions) -> Self {
        let input = self.input(schema, options);
        self.description.set_input(InputSlice::Body, input);
        self
    }

    /// Validates form fields.
    #[must_use]
    pub fn input_forms(self, schema: Arc<Schema>) -> Self {
        self.input_forms_with(schema, InputOptions::new())
    }

    /// Validates form fields, with options.
    #[must_use]
    pub fn input_forms_with(mut self, schema: Arc<Schema>, options: InputOptions) -> Self {
        let input = self.input(schema, options);
        self.description.set_input(InputSlice::Forms, input);
        self
    }

    /// Validates multipart file uploads.
    #[must_use]
    pub fn input_files(self, schema: Arc<Schema>) -> Self {
        self.input_files_with(schema, InputOptions::new())
    }

    /// Validates multipart file uploads, with options.
    #[must_use]
    pub fn input_files_with(mut self, schema: Arc<Schema>, options: InputOptions) -> Self {
        let input = self.input(schema, options);
        self.description.set_input(InputSlice::Files, input);
        self
    }

    /// Validates request headers. Field names are lower-case.
    #[must_use]
    pub fn input_headers(self, schema: Arc<Schema>) -> Self {
        self.input_headers_with(schema, InputOptions::new())
    }

    /// Validates request headers, with options.
    #[must_use]
    pub fn input_headers_with(mut self, schema: Arc<Schema>, options: InputOptions) -> Self {
        let input = self.input(schema, options);
        self.description.set_input(InputSlice::Headers, input);
        self
    }

    /// Serializes and checks the returned value.
    #[must_use]
    pub fn output_body(self, schema: Arc<Schema>) -> Self {
        self.output_body_with(schema, OutputOptions::new())
    }

    /// Serializes and checks the returned value, with options.
    #[must_use]
    pub fn output_body_with(mut self, schema: Arc<Schema>, options: OutputOptions) -> Self {
        self.description.output_body = Some(OutputBodyDescription {
            processor: self.processor(schema, options.processor_factory.as_ref()),
            default_http_code: options
                .default_http_code
                .unwrap_or_else(|| self.hapic.default_output_http_code()),
        });
        self
    }

    /// Streams returned items as newline-delimited JSON, validating each.
    #[must_use]
    pub fn output_stream(self, item_schema: Arc<Schema>) -> Self {
        self.output_stream_with(item_schema, OutputOptions::new())
    }

    /// Streams returned items, with options.
    #[must_use]
    pub fn output_stream_with(mut self, item_schema: Arc<Schema>, options: OutputOptions) -> Self {
        self.description.output_stream = Some(OutputStreamDescription {
            processor: self.processor(item_schema, options.processor_factory.as_ref()),
            default_http_code: options
                .default_http_code
                .unwrap_or_else(|| self.hapic.default_output_http_code()),
            ignore_on_error: options.ignore_on_error,
        });
        self
    }

    /// Sends the returned file.
    #[must_use]
    pub fn output_file<I, S>(self, output_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_file_with(output_types, OutputOptions::new())
    }

    /// Sends the returned file, with options.
    #[must_use]
    pub fn output_file_with<I, S>(mut self, output_types: I, options: OutputOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = Schema::builder("HapicFile").build();
        self.description.output_file = Some(OutputFileDescription {
            processor: self.processor(schema, options.processor_factory.as_ref()),
            output_types: output_types.into_iter().map(Into::into).collect(),
            default_http_code: options
                .default_http_code
                .unwrap_or_else(|| self.hapic.default_output_http_code()),
        });
        self
    }

    /// Maps handler errors of type `E` to `status`.
    #[must_use]
    pub fn handle_exception<E>(self, status: StatusCode) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.handle_error(ErrorMapping::new(ErrorMatcher::of::<E>(), status))
    }

    /// Maps handler errors caused by an `E` anywhere in their source chain.
    #[must_use]
    pub fn handle_exception_in_chain<E>(self, status: StatusCode) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.handle_error(ErrorMapping::new(ErrorMatcher::caused_by::<E>(), status))
    }

    /// Maps handler errors accepted by `predicate`.
    #[must_use]
    pub fn handle_exception_matching(
        self,
        label: impl Into<String>,
        predicate: impl Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
        status: StatusCode,
    ) -> Self {
        self.handle_error(ErrorMapping::new(
            ErrorMatcher::predicate(label, predicate),
            status,
        ))
    }

    /// Maps every handler error to `status`.
    #[must_use]
    pub fn handle_any_exception(self, status: StatusCode) -> Self {
        self.handle_error(ErrorMapping::new(ErrorMatcher::Any, status))
    }

    /// Adds an error table entry.
    #[must_use]
    pub fn handle_error(mut self, mapping: ErrorMapping) -> Self {
        self.description.errors.push(mapping);
        self
    }

    /// Sets documentation metadata.
    #[must_use]
    pub fn with_api_doc(mut self, api_doc: ApiDoc) -> Self {
        self.description.api_doc = Some(api_doc);
        self
    }

    /// Finalizes with a blocking handler.
    ///
    /// Fails when the [`Hapic`] instance runs in cooperative mode.
    pub fn handler<F>(self, handler: F) -> HapicResult<Controller<C>>
    where
        F: Fn(C::Request, HapicData) -> HandlerResult<C::Response> + Send + Sync + 'static,
    {
        self.finish(ExecutionMode::Blocking, Handler::Blocking(Arc::new(handler)))
    }

    /// Finalizes with an async handler.
    ///
    /// Fails when the [`Hapic`] instance runs in blocking mode.
    pub fn async_handler<F, Fut>(self, handler: F) -> HapicResult<Controller<C>>
    where
        F: Fn(C::Request, HapicData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<C::Response>> + Send + 'static,
    {
        let handler: CooperativeHandler<C> =
            Arc::new(move |request, data| Box::pin(handler(request, data)));
        self.finish(ExecutionMode::Cooperative, Handler::Cooperative(handler))
    }

    fn finish(self, mode: ExecutionMode, handler: Handler<C>) -> HapicResult<Controller<C>> {
        if mode != self.hapic.mode() {
            return Err(HapicError::configuration(format!(
                "controller '{}' has a {mode:?} handler but Hapic runs in {:?} mode",
                self.name,
                self.hapic.mode()
            )));
        }

        let decorated = DecoratedController::new(self.name, self.description);
        self.hapic.registry().register(decorated.clone());

        Ok(Controller {
            hapic: self.hapic,
            decorated,
            handler,
        })
    }
}

impl<C: Context> fmt::Debug for ControllerBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBuilder")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A handler wrapped in its declared stages.
pub struct Controller<C: Context> {
    hapic: Hapic<C>,
    decorated: DecoratedController,
    handler: Handler<C>,
}

impl<C: Context> Clone for Controller<C> {
    fn clone(&self) -> Self {
        Self {
            hapic: self.hapic.clone(),
            decorated: self.decorated.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<C: Context> fmt::Debug for Controller<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.decorated.name)
            .field("token", &self.decorated.token)
            .finish_non_exhaustive()
    }
}

impl<C: Context> Controller<C> {
    /// Controller name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.decorated.name
    }

    /// Registry entry: name, token and description.
    #[must_use]
    pub fn decorated(&self) -> &DecoratedController {
        &self.decorated
    }

    /// Handles one request.
    ///
    /// Validation failures and mapped handler errors become responses;
    /// unmatched handler errors are returned as [`HapicError::Handler`].
    pub async fn call(&self, request: C::Request) -> HapicResult<C::Response> {
        let span = tracing::debug_span!("hapic.controller", controller = %self.decorated.name);
        async move {
            let context = self.hapic.context()?;
            let data = match self.load_inputs(context, &request) {
                Ok(data) => data,
                Err(response) => return Ok(response),
            };

            let result = match &self.handler {
                Handler::Blocking(handler) => handler(request, data),
                Handler::Cooperative(handler) => handler(request, data).await,
            };
            self.respond(context, result)
        }
        .instrument(span)
        .await
    }

    /// Handles one request without an async runtime.
    ///
    /// Only blocking controllers can be called this way.
    pub fn call_blocking(&self, request: C::Request) -> HapicResult<C::Response> {
        let Handler::Blocking(handler) = &self.handler else {
            return Err(HapicError::configuration(format!(
                "controller '{}' is cooperative and must be awaited",
                self.decorated.name
            )));
        };

        let span = tracing::debug_span!("hapic.controller", controller = %self.decorated.name);
        let _guard = span.enter();

        let context = self.hapic.context()?;
        let data = match self.load_inputs(context, &request) {
            Ok(data) => data,
            Err(response) => return Ok(response),
        };
        self.respond(context, handler(request, data))
    }

    /// Runs the input stages. `Err` carries the validation error response.
    fn load_inputs(&self, context: &C, request: &C::Request) -> Result<HapicData, C::Response> {
        let description = &self.decorated.description;

        let params = match context.get_request_parameters(request) {
            Ok(params) => params,
            Err(err) => {
                tracing::debug!(error = %err, "cannot read request parameters");
                let mut details = ErrorDetails::new();
                details.insert(SCHEMA_ERROR_KEY.to_string(), vec![err.to_string()]);
                return Err(context.get_validation_error_response(
                    &ProcessValidationError::input(details),
                    self.hapic.default_error_http_code(),
                ));
            }
        };

        let mut data = HapicData::default();
        for (slice, input) in description.inputs() {
            let raw = slice.extract(&params, &input.as_list);
            match input.processor.load_input(&raw) {
                Ok(loaded) => {
                    tracing::debug!(slice = slice.name(), "input validated");
                    assign(&mut data, slice, loaded, &params);
                }
                Err(err) => {
                    let status = description
                        .errors
                        .find_for_validation(&anyhow::Error::new(err.clone()))
                        .map_or(input.error_http_code, |mapping| mapping.status);
                    tracing::debug!(
                        slice = slice.name(),
                        status = status.as_u16(),
                        error = %err,
                        "input validation failed"
                    );
                    let error = input.processor.get_validation_error(&raw);
                    return Err(context.get_validation_error_response(&error, status));
                }
            }
        }
        Ok(data)
    }

    /// Maps the handler result to a response.
    fn respond(
        &self,
        context: &C,
        result: HandlerResult<C::Response>,
    ) -> HapicResult<C::Response> {
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => return self.handle_error(context, err),
        };

        if let Reply::Response(response) = reply {
            return Ok(response);
        }

        let description = &self.decorated.description;
        if let Some(output) = &description.output_body {
            return self.output_body(context, output, reply);
        }
        if let Some(output) = &description.output_stream {
            let encoder = ItemEncoder::new(
                Arc::clone(&output.processor),
                output.ignore_on_error,
                &self.decorated.name,
            );
            return self.output_stream(context, encoder, output.default_http_code, reply);
        }
        if let Some(output) = &description.output_file {
            return self.output_file(
                context,
                output.processor.as_ref(),
                output.default_http_code,
                reply,
            );
        }
        self.output_raw(context, reply)
    }

    fn handle_error(&self, context: &C, err: anyhow::Error) -> HapicResult<C::Response> {
        match self.decorated.description.errors.find(&err) {
            Some(mapping) => {
                tracing::debug!(
                    error = %err,
                    matcher = mapping.matcher.label(),
                    status = mapping.status.as_u16(),
                    "handler error mapped"
                );
                let body = self.hapic.error_builder().build_from_error(&err);
                Ok(context.get_response(body, mapping.status))
            }
            None => {
                tracing::debug!(error = %err, "handler error not mapped");
                Err(HapicError::Handler(err))
            }
        }
    }

    fn output_body(
        &self,
        context: &C,
        output: &OutputBodyDescription,
        reply: Reply<C::Response>,
    ) -> HapicResult<C::Response> {
        let value = match reply {
            Reply::Value(value) => value,
            other => return Err(self.unexpected_reply(&other, "output_body")),
        };

        if output.default_http_code == StatusCode::NO_CONTENT {
            return Ok(context.get_response(Value::Null, StatusCode::NO_CONTENT));
        }

        match output.processor.dump_output(&value) {
            Ok(dumped) => Ok(context.get_response(dumped, output.default_http_code)),
            Err(err) => {
                tracing::warn!(controller = %self.decorated.name, error = %err, "output validation failed");
                Ok(context.get_validation_error_response(
                    &output_error(err),
                    StatusCode::INTERNAL_SERVER_ERROR,
                ))
            }
        }
    }

    fn output_stream(
        &self,
        context: &C,
        encoder: ItemEncoder,
        status: StatusCode,
        reply: Reply<C::Response>,
    ) -> HapicResult<C::Response> {
        match reply {
            Reply::Stream(items) => Ok(context.get_stream_response(encoder.encode_stream(items), status)),
            Reply::Iter(items) => Ok(self.iter_response(context, encoder.encode_iter(items), status)),
            Reply::Value(Value::Array(items)) => {
                Ok(self.iter_response(context, encoder.encode_iter(Box::new(items.into_iter())), status))
            }
            other => Err(self.unexpected_reply(&other, "output_stream")),
        }
    }

    fn iter_response(
        &self,
        context: &C,
        chunks: hapic_core::ChunkIter,
        status: StatusCode,
    ) -> C::Response {
        match self.hapic.mode() {
            ExecutionMode::Blocking => context.get_blocking_stream_response(chunks, status),
            ExecutionMode::Cooperative => {
                context.get_stream_response(Box::pin(stream::iter(chunks)), status)
            }
        }
    }

    fn output_file(
        &self,
        context: &C,
        processor: &dyn Processor,
        status: StatusCode,
        reply: Reply<C::Response>,
    ) -> HapicResult<C::Response> {
        let file = match reply {
            Reply::File(file) => file,
            other => return Err(self.unexpected_reply(&other, "output_file")),
        };

        match processor.dump_output_file(file) {
            Ok(file) => context.get_file_response(file, status),
            Err(err) => {
                tracing::warn!(controller = %self.decorated.name, error = %err, "invalid file output");
                Ok(context.get_validation_error_response(
                    &output_error(err),
                    StatusCode::INTERNAL_SERVER_ERROR,
                ))
            }
        }
    }

    /// No output stage: values, files and items are sent as they are.
    fn output_raw(&self, context: &C, reply: Reply<C::Response>) -> HapicResult<C::Response> {
        let status = self.hapic.default_output_http_code();
        match reply {
            Reply::Value(value) => Ok(context.get_response(value, status)),
            Reply::File(file) => {
                file.validate()?;
                context.get_file_response(file, status)
            }
            Reply::Stream(items) => Ok(context.get_stream_response(
                ItemEncoder::passthrough(&self.decorated.name).encode_stream(items),
                status,
            )),
            Reply::Iter(items) => Ok(self.iter_response(
                context,
                ItemEncoder::passthrough(&self.decorated.name).encode_iter(items),
                status,
            )),
            Reply::Response(response) => Ok(response),
        }
    }

    fn unexpected_reply(&self, reply: &Reply<C::Response>, stage: &str) -> HapicError {
        HapicError::configuration(format!(
            "controller '{}' declares {stage} but returned a {}",
            self.decorated.name,
            reply.kind()
        ))
    }
}

fn assign(data: &mut HapicData, slice: InputSlice, loaded: Value, params: &RequestParameters) {
    match slice {
        InputSlice::Path => data.path = loaded,
        InputSlice::Query => data.query = loaded,
        InputSlice::Headers => data.headers = loaded,
        InputSlice::Body => data.body = loaded,
        InputSlice::Forms => data.forms = loaded,
        InputSlice::Files => {
            if let Value::Object(accepted) = &loaded {
                data.files = params
                    .files
                    .iter()
                    .filter(|(name, _)| accepted.contains_key(name.as_str()))
                    .map(|(name, file)| (name.clone(), file.clone()))
                    .collect();
            }
        }
    }
}

fn output_error(err: ProcessError) -> ProcessValidationError {
    match err {
        ProcessError::OutputValidation(error) | ProcessError::InputValidation(error) => {
            ProcessValidationError::output(error.details)
        }
        other => {
            let mut details = ErrorDetails::new();
            details.insert(SCHEMA_ERROR_KEY.to_string(), vec![other.to_string()]);
            ProcessValidationError::output(details)
        }
    }
}
