//! The Hapic instance: execution mode, defaults, context and registry.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use hapic_config::HapicConfig;
use hapic_core::{
    default_processor_factory, Context, ControllerRegistry, DecoratedController,
    DefaultErrorBuilder, ErrorBuilder, HapicError, HapicResult, ProcessorFactory,
};
use hapic_docs::{DocGenerator, DocsResult, OpenApi};
use http::StatusCode;

use crate::controller::ControllerBuilder;
use crate::ExecutionMode;

struct HapicInner<C: Context> {
    mode: ExecutionMode,
    config: HapicConfig,
    processor_factory: ProcessorFactory,
    error_builder: Arc<dyn ErrorBuilder>,
    context: OnceLock<C>,
    registry: ControllerRegistry,
}

/// Entry point decorating controllers for one framework adapter.
///
/// Cloning is cheap; clones share the context and the controller registry.
///
/// # Example
///
/// ```rust,ignore
/// let hapic = Hapic::<HttpContext>::new(ExecutionMode::Cooperative);
/// let hello = hapic
///     .controller("hello")
///     .input_query(name_schema)
///     .output_body(greeting_schema)
///     .async_handler(|_request, data| async move {
///         Ok(Reply::from(json!({"message": format!("Hello {}", data.query["name"])})))
///     })?;
///
/// hapic.set_context(HttpContext::new(&router))?;
/// ```
pub struct Hapic<C: Context> {
    inner: Arc<HapicInner<C>>,
}

impl<C: Context> Clone for Hapic<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Context> fmt::Debug for Hapic<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hapic")
            .field("mode", &self.inner.mode)
            .field("context_set", &self.inner.context.get().is_some())
            .field("controllers", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}

impl<C: Context> Hapic<C> {
    /// Creates an instance with default settings in the given mode.
    #[must_use]
    pub fn new(mode: ExecutionMode) -> Self {
        HapicBuilder::new().mode(mode).build()
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> HapicBuilder<C> {
        HapicBuilder::new()
    }

    /// Execution mode chosen at construction.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.inner.mode
    }

    /// Configuration the instance was built from.
    #[must_use]
    pub fn config(&self) -> &HapicConfig {
        &self.inner.config
    }

    /// Installs the framework adapter. Can be called once.
    pub fn set_context(&self, context: C) -> HapicResult<()> {
        self.inner
            .context
            .set(context)
            .map_err(|_| HapicError::ContextAlreadySet)?;
        tracing::debug!(mode = ?self.inner.mode, "context adapter set");
        Ok(())
    }

    /// The framework adapter.
    pub fn context(&self) -> HapicResult<&C> {
        self.inner.context.get().ok_or(HapicError::ContextNotSet)
    }

    /// Starts decorating a controller.
    #[must_use]
    pub fn controller(&self, name: impl Into<String>) -> ControllerBuilder<C> {
        ControllerBuilder::new(self.clone(), name.into())
    }

    /// Every finalized controller, in registration order.
    #[must_use]
    pub fn controllers(&self) -> Vec<DecoratedController> {
        self.inner.registry.controllers()
    }

    /// Builder of handler error bodies.
    #[must_use]
    pub fn error_builder(&self) -> &Arc<dyn ErrorBuilder> {
        &self.inner.error_builder
    }

    /// Doc generator preloaded with the `doc` configuration section.
    #[must_use]
    pub fn doc_generator(&self) -> DocGenerator {
        let doc = &self.inner.config.doc;
        let mut generator = DocGenerator::new()
            .title(doc.title.clone())
            .version(doc.version.clone());
        if let Some(description) = &doc.description {
            generator = generator.description(description.clone());
        }
        if let Some(host) = &doc.host {
            generator = generator.host(host.clone());
        }
        if let Some(base_path) = &doc.base_path {
            generator = generator.base_path(base_path.clone());
        }
        for scheme in &doc.schemes {
            generator = generator.scheme(scheme.clone());
        }
        generator
    }

    /// Generates the OpenAPI document of every documented controller.
    pub fn generate_doc(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> DocsResult<OpenApi> {
        let generator = self
            .doc_generator()
            .title(title)
            .description(description);
        self.generate_doc_with(&generator)
    }

    /// Generates the OpenAPI document with a custom generator.
    pub fn generate_doc_with(&self, generator: &DocGenerator) -> DocsResult<OpenApi> {
        let context = self.context()?;
        generator.generate(
            &self.inner.registry.controllers(),
            context,
            &self.inner.error_builder.schema(),
        )
    }

    pub(crate) fn registry(&self) -> &ControllerRegistry {
        &self.inner.registry
    }

    pub(crate) fn processor_factory(&self) -> &ProcessorFactory {
        &self.inner.processor_factory
    }

    pub(crate) fn default_error_http_code(&self) -> StatusCode {
        status_or(
            self.inner.config.processing.default_error_http_code,
            StatusCode::BAD_REQUEST,
        )
    }

    pub(crate) fn default_output_http_code(&self) -> StatusCode {
        status_or(
            self.inner.config.processing.default_output_http_code,
            StatusCode::OK,
        )
    }
}

fn status_or(code: u16, fallback: StatusCode) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(fallback)
}

/// Builder for [`Hapic`].
#[must_use]
pub struct HapicBuilder<C: Context> {
    config: HapicConfig,
    processor_factory: Option<ProcessorFactory>,
    error_builder: Option<Arc<dyn ErrorBuilder>>,
    _context: PhantomData<fn() -> C>,
}

impl<C: Context> HapicBuilder<C> {
    /// Builder with default configuration.
    pub fn new() -> Self {
        Self::from_config(HapicConfig::default())
    }

    /// Builder taking mode, default codes and doc settings from `config`.
    pub fn from_config(config: HapicConfig) -> Self {
        Self {
            config,
            processor_factory: None,
            error_builder: None,
            _context: PhantomData,
        }
    }

    /// Sets the execution mode.
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.config.processing.mode = mode;
        self
    }

    /// Sets the default processor factory used by every decorator.
    pub fn processor_factory(mut self, factory: ProcessorFactory) -> Self {
        self.processor_factory = Some(factory);
        self
    }

    /// Sets the builder of handler error bodies.
    pub fn error_builder(mut self, error_builder: impl ErrorBuilder + 'static) -> Self {
        self.error_builder = Some(Arc::new(error_builder));
        self
    }

    /// Builds the instance.
    pub fn build(self) -> Hapic<C> {
        let mode = self.config.processing.mode;
        tracing::debug!(?mode, "creating Hapic instance");
        Hapic {
            inner: Arc::new(HapicInner {
                mode,
                config: self.config,
                processor_factory: self
                    .processor_factory
                    .unwrap_or_else(default_processor_factory),
                error_builder: self
                    .error_builder
                    .unwrap_or_else(|| Arc::new(DefaultErrorBuilder::new())),
                context: OnceLock::new(),
                registry: ControllerRegistry::new(),
            }),
        }
    }
}

impl<C: Context> Default for HapicBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Context> fmt::Debug for HapicBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HapicBuilder")
            .field("config", &self.config)
            .field("custom_processor", &self.processor_factory.is_some())
            .field("error_builder", &self.error_builder)
            .finish()
    }
}
