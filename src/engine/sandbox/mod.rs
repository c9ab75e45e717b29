//! Isolated evaluation of a single script.
//!
//! Every execution gets a fresh [`rhai::Engine`] and [`rhai::Scope`] built by
//! [`Sandbox::create_sandbox`]. Only the capabilities the configuration allows
//! are registered and bound, so a script cannot reach anything the host did
//! not hand it explicitly. Source is screened before it is compiled, the
//! compiled program is checked for references to blocked names, and
//! evaluation runs on the blocking pool under both a cooperative and a hard
//! deadline.

mod builtins;
mod cancellation;
mod capabilities;
mod emitter;
mod security;
mod utilities;

use std::time::{Duration, Instant};

pub use cancellation::CancellationToken;
pub use capabilities::{Capability, CapabilityEnv, LogSink, MAX_LOG_LINES};
pub use emitter::Emitter;
use rhai::{Dynamic, Engine, EvalAltResult, ParseError, Position, Scope};
pub use security::{ScreeningFlags, SecurityPolicy, ThreatFamily};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::rhai::{
    ast_analysis::analyze_ast,
    conversions::{display_dynamic, dynamic_to_json, json_to_dynamic},
    create_engine,
};
use crate::{
    config::{RhaiConfig, SandboxConfig},
    models::{ErrorKind, ExecutionContext, ExecutionError, ScriptConfig, SecurityReport},
};

/// Extra time the caller waits past the deadline for the evaluation to stop
/// on its own before abandoning it.
const HARD_DEADLINE_GRACE: Duration = Duration::from_millis(100);

/// Failure of a sandboxed evaluation.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The source or the compiled program references forbidden names.
    #[error("Security violation: {}", .0.join("; "))]
    SecurityViolation(Vec<String>),

    /// The source does not parse.
    #[error("{message}")]
    Syntax {
        /// Parser message.
        message: String,
        /// Line and column.
        position: Option<(usize, usize)>,
    },

    /// The deadline passed before the evaluation finished.
    #[error("Script execution timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The operation budget ran out.
    #[error("Script exceeded the operation budget of {0} operations")]
    OperationLimit(u64),

    /// The script threw or failed while running.
    #[error("{message}")]
    Runtime {
        /// Thrown value or evaluator message.
        message: String,
        /// Line and column.
        position: Option<(usize, usize)>,
    },

    /// The blocking task running the evaluation failed.
    #[error("Sandbox worker failed: {0}")]
    Worker(String),
}

impl SandboxError {
    /// The error taxonomy entry for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SandboxError::SecurityViolation(_) => ErrorKind::SecurityViolation,
            SandboxError::Syntax { .. } => ErrorKind::Syntax,
            SandboxError::Timeout(_) | SandboxError::OperationLimit(_) => ErrorKind::Timeout,
            SandboxError::Runtime { .. } | SandboxError::Worker(_) => ErrorKind::Runtime,
        }
    }

    /// Source location of the failure, if known.
    pub fn stack(&self) -> Option<String> {
        match self {
            SandboxError::Syntax { position: Some((line, column)), .. }
            | SandboxError::Runtime { position: Some((line, column)), .. } =>
                Some(format!("at line {line}, position {column}")),
            _ => None,
        }
    }

    fn from_parse(err: ParseError) -> Self {
        SandboxError::Syntax { message: err.err_type().to_string(), position: location(err.position()) }
    }
}

impl From<SandboxError> for ExecutionError {
    fn from(err: SandboxError) -> Self {
        let error = ExecutionError::new(err.kind(), err.to_string());
        match err.stack() {
            Some(stack) => error.with_stack(stack),
            None => error,
        }
    }
}

fn location(position: Position) -> Option<(usize, usize)> {
    Some((position.line()?, position.position().unwrap_or(0)))
}

/// What a successful evaluation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxOutput {
    /// The script's completion value.
    pub value: Value,
    /// Captured console and print output.
    pub logs: Vec<String>,
}

/// Inputs for building one sandbox.
#[derive(Debug, Clone)]
pub struct SandboxRequest<'a> {
    /// Per-script settings.
    pub script: &'a ScriptConfig,
    /// Variables and functions to bind.
    pub context: Option<&'a ExecutionContext>,
    /// Destination of `emit(value)`.
    pub emitter: Emitter,
}

impl<'a> SandboxRequest<'a> {
    /// A request without context or streaming.
    pub fn new(script: &'a ScriptConfig) -> Self {
        Self { script, context: None, emitter: Emitter::disabled() }
    }

    /// Binds `context` into the sandbox.
    pub fn with_context(mut self, context: Option<&'a ExecutionContext>) -> Self {
        self.context = context;
        self
    }

    /// Routes `emit(value)` to `emitter`.
    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.emitter = emitter;
        self
    }
}

/// A ready-to-run, single-use sandbox.
///
/// Evaluation consumes the handle. After a timeout the evaluation may still
/// be winding down on the blocking pool, but nothing else can reach it.
#[derive(Debug)]
pub struct SandboxHandle {
    id: Uuid,
    engine: Engine,
    scope: Scope<'static>,
    policy: SecurityPolicy,
    env: CapabilityEnv,
    function_source: String,
    capabilities: Vec<Capability>,
    max_operations: u64,
}

impl SandboxHandle {
    /// Identifier used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Capabilities bound into this sandbox.
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// The sink console output is written to. Clone it before running to
    /// read logs of a failed evaluation.
    pub fn logs(&self) -> LogSink {
        self.env.logs.clone()
    }

    /// The token the evaluation polls.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.env.token.clone()
    }

    fn run(mut self, code: &str) -> Result<SandboxOutput, SandboxError> {
        let user_ast =
            self.engine.compile_with_scope(&self.scope, code).map_err(SandboxError::from_parse)?;

        let ast = if self.function_source.is_empty() {
            user_ast
        } else {
            let functions = self
                .engine
                .compile_with_scope(&self.scope, &self.function_source)
                .map_err(|err| match SandboxError::from_parse(err) {
                    SandboxError::Syntax { message, position } => SandboxError::Syntax {
                        message: format!("{message} (in context functions)"),
                        position,
                    },
                    other => other,
                })?;
            functions.merge(&user_ast)
        };

        let references = analyze_ast(&ast).blocked_references(&self.policy.forbidden_names());
        if !references.is_empty() {
            return Err(SandboxError::SecurityViolation(
                references.iter().map(|name| format!("Reference to blocked name '{name}'")).collect(),
            ));
        }

        let value = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut self.scope, &ast)
            .map_err(|err| classify(*err, &self.policy, self.max_operations))?;

        Ok(SandboxOutput { value: dynamic_to_json(&value), logs: self.env.logs.snapshot() })
    }
}

/// Maps a Rhai evaluation error onto the sandbox taxonomy.
fn classify(err: EvalAltResult, policy: &SecurityPolicy, max_operations: u64) -> SandboxError {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => classify(*inner, policy, max_operations),
        EvalAltResult::ErrorTooManyOperations(_) => SandboxError::OperationLimit(max_operations),
        EvalAltResult::ErrorTerminated(_, _) => SandboxError::Timeout(Duration::ZERO),
        EvalAltResult::ErrorRuntime(value, position) =>
            SandboxError::Runtime { message: display_dynamic(&value), position: location(position) },
        EvalAltResult::ErrorParsing(err_type, position) =>
            SandboxError::Syntax { message: err_type.to_string(), position: location(position) },
        EvalAltResult::ErrorVariableNotFound(name, _) if policy.is_forbidden(&name) =>
            SandboxError::SecurityViolation(vec![format!("Reference to blocked name '{name}'")]),
        EvalAltResult::ErrorFunctionNotFound(signature, _)
            if policy.is_forbidden(function_name(&signature)) =>
        {
            let name = function_name(&signature);
            SandboxError::SecurityViolation(vec![format!("Reference to blocked name '{name}'")])
        }
        other => {
            let position = location(other.position());
            SandboxError::Runtime { message: other.to_string(), position }
        }
    }
}

/// Extracts the bare name from a Rhai function signature such as
/// `eval (&str | ImmutableString | String)`.
fn function_name(signature: &str) -> &str {
    signature.split([' ', '(']).next().unwrap_or(signature)
}

/// Builds and runs sandboxes from a fixed policy and set of limits.
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    config: SandboxConfig,
    rhai_config: RhaiConfig,
}

impl Sandbox {
    /// Creates a sandbox factory.
    pub fn new(config: SandboxConfig, rhai_config: RhaiConfig) -> Self {
        Self { config, rhai_config }
    }

    /// The capability policy.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Resolves the forbidden names for a script with the given flags.
    pub fn policy_for(&self, script: &ScriptConfig) -> SecurityPolicy {
        let flags = ScreeningFlags::new(
            &self.config,
            script.allow_network_access,
            script.allow_file_system_access,
        );
        SecurityPolicy::new(&self.config, flags)
    }

    /// Builds a fresh engine and scope for one evaluation.
    pub fn create_sandbox(&self, request: SandboxRequest<'_>) -> SandboxHandle {
        let script = request.script;
        let policy = self.policy_for(script);
        let env = CapabilityEnv::default();
        let id = Uuid::new_v4();

        let mut engine = create_engine(&self.rhai_config);
        engine.set_strict_variables(script.strict_mode);
        if script.max_memory > 0 {
            let cap = usize::try_from(script.max_memory).unwrap_or(usize::MAX);
            let current = engine.max_string_size();
            engine.set_max_string_size(if current == 0 { cap } else { current.min(cap) });
        }
        if !self.config.allow_eval {
            engine.disable_symbol("eval");
        }

        let logs = env.logs.clone();
        engine.on_print(move |text| logs.push(text));
        let logs = env.logs.clone();
        engine.on_debug(move |text, _, _| logs.push(format!("[debug] {text}")));

        let token = env.token.clone();
        let interval = self.rhai_config.progress_check_interval.max(1);
        engine.on_progress(move |operations| {
            if operations % interval == 0 && token.is_cancelled() {
                Some(Dynamic::from("execution deadline exceeded"))
            } else {
                None
            }
        });

        request.emitter.register(&mut engine);

        let mut scope = Scope::new();
        let mut function_source = String::new();

        if let Some(context) = request.context {
            for (name, value) in &context.variables {
                if policy.is_forbidden(name) {
                    tracing::debug!(sandbox = %id, variable = %name, "Skipping blocked context variable");
                    continue;
                }
                scope.push(name.clone(), json_to_dynamic(value));
            }
            for (name, function) in &context.functions {
                if policy.is_forbidden(name) {
                    tracing::debug!(sandbox = %id, function = %name, "Skipping blocked context function");
                    continue;
                }
                function_source.push_str(&function.to_definition(name));
                function_source.push('\n');
            }
        }

        let frozen = !self.config.allow_prototype_pollution;
        let mut capabilities = Vec::new();
        for &capability in &self.config.allowed_globals {
            if policy.is_forbidden(capability.binding_name()) || policy.is_forbidden(capability.tag()) {
                continue;
            }
            if capability == Capability::Timers && !script.async_support {
                continue;
            }
            capability.install(&mut engine, &mut scope, &env, frozen);
            capabilities.push(capability);
        }

        tracing::debug!(sandbox = %id, capabilities = ?capabilities, "Sandbox created");

        SandboxHandle {
            id,
            engine,
            scope,
            policy,
            env,
            function_source,
            capabilities,
            max_operations: self.rhai_config.max_operations,
        }
    }

    /// Screens, compiles and evaluates `code` in `handle`.
    ///
    /// The timeout clock starts here. If the evaluation does not stop within
    /// a short grace period after the deadline it is abandoned.
    pub async fn execute_in_sandbox(
        &self,
        code: String,
        handle: SandboxHandle,
        timeout: Duration,
    ) -> Result<SandboxOutput, SandboxError> {
        let sandbox_id = handle.id;
        let mut issues = handle.policy.screen(&code);
        if !handle.function_source.is_empty() {
            issues.extend(
                handle
                    .policy
                    .screen(&handle.function_source)
                    .into_iter()
                    .map(|issue| format!("{issue} in context functions")),
            );
        }
        if !issues.is_empty() {
            tracing::debug!(sandbox = %sandbox_id, issues = issues.len(), "Script rejected by screening");
            return Err(SandboxError::SecurityViolation(issues));
        }

        let token = handle.cancellation_token();
        token.arm(Instant::now() + timeout);

        let worker = tokio::task::spawn_blocking(move || handle.run(&code));
        match tokio::time::timeout(timeout + HARD_DEADLINE_GRACE, worker).await {
            Ok(Ok(Err(SandboxError::Timeout(_)))) => Err(SandboxError::Timeout(timeout)),
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                tracing::error!(sandbox = %sandbox_id, error = %join_error, "Sandbox worker failed");
                Err(SandboxError::Worker(join_error.to_string()))
            }
            Err(_) => {
                token.cancel();
                tracing::warn!(sandbox = %sandbox_id, timeout_ms = timeout.as_millis() as u64, "Abandoning sandbox past its deadline");
                Err(SandboxError::Timeout(timeout))
            }
        }
    }

    /// Releases a handle that will not be run.
    pub fn destroy_sandbox(&self, handle: SandboxHandle) {
        handle.env.token.cancel();
        tracing::debug!(sandbox = %handle.id, "Sandbox destroyed");
    }

    /// Screens `code` under the default script flags without running it.
    pub fn check_code_security(&self, code: &str) -> SecurityReport {
        self.check_code_security_for(&ScriptConfig::new(code))
    }

    /// Screens `script.code` under the script's own flags.
    pub fn check_code_security_for(&self, script: &ScriptConfig) -> SecurityReport {
        SecurityReport::from_issues(self.policy_for(script).screen(&script.code))
    }
}
