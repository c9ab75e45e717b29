//! The public entry point tying executor, templates and contexts together.

use std::{
    collections::BTreeSet,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use futures::{Stream, StreamExt, stream};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use super::{executor::ScriptExecutor, sandbox::Emitter};
use crate::{
    config::{AdmissionPolicy, AppConfig, EngineConfig, RhaiConfig, SandboxConfig},
    contexts::{ContextManager, DEFAULT_CONTEXT_ID},
    models::{
        ENGINE_STATE_VERSION, EngineState, ErrorKind, ExecutionContext, ExecutionError, ExecutionRequest,
        ExecutionResult, ExecutionStats, ScriptConfig, SecurityReport, StreamEvent, SyntaxCheck,
    },
    templates::{TemplateError, TemplateManager, validate_definition},
};

/// Partial events buffered per stream before `emit` waits for the subscriber.
const STREAM_BUFFER: usize = 64;

/// Errors returned by the engine facade. Script failures are not errors;
/// they are reported inside [`ExecutionResult`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Every execution slot is taken and the policy is fail-fast.
    #[error("Execution capacity exhausted: {0} executions already running")]
    Capacity(usize),

    /// The referenced context does not exist.
    #[error("Context '{0}' not found")]
    ContextNotFound(String),

    /// A request carried neither code nor a template id.
    #[error("Request must contain either code or a templateId")]
    EmptyRequest,

    /// Template lookup or code generation failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The engine is shutting down.
    #[error("Engine is shut down")]
    Closed,
}

impl EngineError {
    /// The error taxonomy entry for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Capacity(_) => ErrorKind::Capacity,
            EngineError::Template(TemplateError::Parameter(_)) => ErrorKind::ParameterValidation,
            _ => ErrorKind::Runtime,
        }
    }

    /// Converts the error into a failed result, for callers that report
    /// every outcome uniformly.
    pub fn into_result(self) -> ExecutionResult {
        ExecutionResult::failure(ExecutionError::new(self.kind(), self.to_string()), 0.0, Vec::new())
    }
}

/// An [`EngineState`] document was rejected. Nothing was changed.
#[derive(Debug, Error, PartialEq)]
pub enum StateImportError {
    /// The document was written by an incompatible version.
    #[error("Unsupported state version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version in the document.
        found: u32,
        /// Version this engine writes.
        expected: u32,
    },

    /// A template id belongs to a system template.
    #[error("Template '{0}' collides with a system template")]
    SystemTemplate(String),

    /// A template definition is invalid.
    #[error("Template '{id}' is invalid: {reason}")]
    InvalidTemplate {
        /// Template id.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The document contains the default context.
    #[error("The default context cannot be imported")]
    DefaultContext,

    /// The same id appears twice.
    #[error("Duplicate id '{0}' in state document")]
    DuplicateId(String),
}

/// Ordered events of one streaming execution.
///
/// Partial events arrive in emission order and the last event is always
/// [`StreamEvent::Completed`]. Dropping the stream stops delivery.
#[derive(Debug)]
pub struct ExecutionStream {
    events: ReceiverStream<StreamEvent>,
}

impl ExecutionStream {
    /// Waits for the next event.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.next().await
    }
}

impl Stream for ExecutionStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

struct EngineInner {
    config: EngineConfig,
    executor: ScriptExecutor,
    templates: TemplateManager,
    contexts: ContextManager,
    permits: Arc<Semaphore>,
}

/// A script engine instance. Cloning is cheap and clones share all state.
#[derive(Clone)]
pub struct ScriptEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("config", &self.inner.config)
            .field("available_permits", &self.inner.permits.available_permits())
            .finish()
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), RhaiConfig::default(), SandboxConfig::default())
    }
}

impl ScriptEngine {
    /// Creates an engine with seeded templates and contexts.
    pub fn new(config: EngineConfig, rhai_config: RhaiConfig, sandbox_config: SandboxConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_executions.max(1)));
        let executor = ScriptExecutor::new(sandbox_config, rhai_config, config.syntax_cache_capacity);
        Self {
            inner: Arc::new(EngineInner {
                config,
                executor,
                templates: TemplateManager::new(),
                contexts: ContextManager::new(),
                permits,
            }),
        }
    }

    /// Creates an engine from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(config.engine.clone(), config.rhai.clone(), config.sandbox.clone())
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// The template catalogue.
    pub fn templates(&self) -> &TemplateManager {
        &self.inner.templates
    }

    /// The context store.
    pub fn contexts(&self) -> &ContextManager {
        &self.inner.contexts
    }

    async fn admit(&self) -> Result<OwnedSemaphorePermit, EngineError> {
        let permits = self.inner.permits.clone();
        match self.inner.config.admission_policy {
            AdmissionPolicy::Queue => permits.acquire_owned().await.map_err(|_| EngineError::Closed),
            AdmissionPolicy::FailFast => permits.try_acquire_owned().map_err(|err| match err {
                TryAcquireError::NoPermits => {
                    tracing::warn!(
                        limit = self.inner.config.max_concurrent_executions,
                        "Rejecting execution, capacity exhausted"
                    );
                    EngineError::Capacity(self.inner.config.max_concurrent_executions)
                }
                TryAcquireError::Closed => EngineError::Closed,
            }),
        }
    }

    fn script_config(&self, code: impl Into<String>) -> ScriptConfig {
        ScriptConfig::from_engine_defaults(code, &self.inner.config)
    }

    fn default_context(&self) -> Option<ExecutionContext> {
        self.inner.contexts.get_context(DEFAULT_CONTEXT_ID)
    }

    /// Runs `code`. Without a context the `default` context is bound.
    pub async fn execute(
        &self,
        code: impl Into<String>,
        context: Option<ExecutionContext>,
    ) -> Result<ExecutionResult, EngineError> {
        let context = context.or_else(|| self.default_context());
        self.execute_script(self.script_config(code), context).await
    }

    /// Runs a fully specified script config with exactly the given context.
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn execute_script(
        &self,
        config: ScriptConfig,
        context: Option<ExecutionContext>,
    ) -> Result<ExecutionResult, EngineError> {
        let _permit = self.admit().await?;
        Ok(self.inner.executor.execute(config, context).await)
    }

    /// Runs `code` with the stored context `context_id`.
    pub async fn execute_in_context(
        &self,
        code: impl Into<String>,
        context_id: &str,
    ) -> Result<ExecutionResult, EngineError> {
        let context = self
            .inner
            .contexts
            .get_context(context_id)
            .ok_or_else(|| EngineError::ContextNotFound(context_id.to_string()))?;
        self.execute_script(self.script_config(code), Some(context)).await
    }

    /// Generates code from a template and runs it with the `default` context.
    pub async fn execute_template(
        &self,
        template_id: &str,
        parameters: &Map<String, Value>,
    ) -> Result<ExecutionResult, EngineError> {
        let code = self.inner.templates.generate_code(template_id, parameters)?;
        self.execute(code, None).await
    }

    /// Handles an inbound request.
    ///
    /// Template parameter failures are reported as a failed result with a
    /// `ParameterValidationError`; a missing template or context is an error.
    pub async fn execute_request(&self, request: ExecutionRequest) -> Result<ExecutionResult, EngineError> {
        let code = match (&request.template_id, request.code) {
            (Some(template_id), _) => {
                let parameters = request.parameters.unwrap_or_default();
                match self.inner.templates.generate_code(template_id, &parameters) {
                    Ok(code) => code,
                    Err(TemplateError::Parameter(err)) => {
                        return Ok(EngineError::Template(TemplateError::Parameter(err)).into_result());
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            (None, Some(code)) => code,
            (None, None) => return Err(EngineError::EmptyRequest),
        };

        let mut context = match &request.context_id {
            Some(id) => Some(
                self.inner.contexts.get_context(id).ok_or_else(|| EngineError::ContextNotFound(id.clone()))?,
            ),
            None => self.default_context(),
        };
        if let Some(variables) = request.context {
            let base = context.get_or_insert_with(|| ExecutionContext::new("inline", "inline"));
            base.variables.extend(variables);
        }

        let mut config = self.script_config(code);
        if let Some(timeout) = request.timeout {
            config.timeout = Duration::from_millis(timeout);
        }
        self.execute_script(config, context).await
    }

    /// Runs independent requests, returning results in input order. At most
    /// `max_concurrent_executions` of the batch run at once.
    pub async fn execute_batch(&self, requests: Vec<ExecutionRequest>) -> Vec<ExecutionResult> {
        let width = self.inner.config.max_concurrent_executions.max(1);
        stream::iter(requests)
            .map(|request| async move {
                self.execute_request(request).await.unwrap_or_else(EngineError::into_result)
            })
            .buffered(width)
            .collect()
            .await
    }

    /// Runs `code`, streaming every `emit(value)` as a partial event and
    /// finishing with the result. Admission happens before this returns.
    pub async fn execute_stream(
        &self,
        code: impl Into<String>,
        context: Option<ExecutionContext>,
    ) -> Result<ExecutionStream, EngineError> {
        let permit = self.admit().await?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let config = self.script_config(code);
        let context = context.or_else(|| self.default_context());
        let engine = self.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let emitter = Emitter::new(tx.clone());
            let result = engine.inner.executor.execute_with_emitter(config, context, emitter).await;
            if tx.send(StreamEvent::Completed { result }).await.is_err() {
                tracing::debug!("Stream subscriber dropped before completion");
            }
        });

        Ok(ExecutionStream { events: ReceiverStream::new(rx) })
    }

    /// Screens `code` without running it or touching statistics.
    pub fn check_script_security(&self, code: &str) -> SecurityReport {
        self.inner.executor.sandbox().check_code_security(code)
    }

    /// Checks that `code` parses.
    pub fn validate_syntax(&self, code: &str) -> SyntaxCheck {
        self.inner.executor.validate_syntax(code)
    }

    /// Statistics since start or the last clear.
    pub fn get_execution_stats(&self) -> ExecutionStats {
        self.inner.executor.get_execution_stats()
    }

    /// Resets the statistics.
    pub fn clear_stats(&self) {
        self.inner.executor.clear_stats();
    }

    /// Captures statistics, user templates and every context except
    /// `default`.
    pub fn export_state(&self) -> EngineState {
        EngineState {
            version: ENGINE_STATE_VERSION,
            stats: self.get_execution_stats(),
            templates: self.inner.templates.user_templates(),
            contexts: self
                .inner
                .contexts
                .list_contexts()
                .into_iter()
                .filter(|context| context.id != DEFAULT_CONTEXT_ID)
                .collect(),
        }
    }

    /// Loads a state document. The whole document is validated before
    /// anything is changed; templates and contexts are upserted by id.
    pub fn import_state(&self, state: EngineState) -> Result<(), StateImportError> {
        if state.version != ENGINE_STATE_VERSION {
            return Err(StateImportError::UnsupportedVersion {
                found: state.version,
                expected: ENGINE_STATE_VERSION,
            });
        }

        let mut template_ids = BTreeSet::new();
        for template in &state.templates {
            if template.is_system || self.inner.templates.is_system_template(&template.id) {
                return Err(StateImportError::SystemTemplate(template.id.clone()));
            }
            if !template_ids.insert(template.id.as_str()) {
                return Err(StateImportError::DuplicateId(template.id.clone()));
            }
            validate_definition(&template.name, &template.code, &template.parameters).map_err(|err| {
                StateImportError::InvalidTemplate { id: template.id.clone(), reason: err.to_string() }
            })?;
        }

        let mut context_ids = BTreeSet::new();
        for context in &state.contexts {
            if context.id == DEFAULT_CONTEXT_ID {
                return Err(StateImportError::DefaultContext);
            }
            if !context_ids.insert(context.id.as_str()) {
                return Err(StateImportError::DuplicateId(context.id.clone()));
            }
        }

        self.inner.executor.restore_stats(&state.stats);
        let (templates, contexts) = (state.templates.len(), state.contexts.len());
        for template in state.templates {
            let id = template.id.clone();
            self.inner
                .templates
                .import_template(template)
                .map_err(|err| StateImportError::InvalidTemplate { id, reason: err.to_string() })?;
        }
        for context in state.contexts {
            self.inner.contexts.insert_context(context);
        }

        tracing::info!(templates, contexts, "Engine state imported");
        Ok(())
    }
}
