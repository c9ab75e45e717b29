//! Runs one script end to end and turns the outcome into an
//! [`ExecutionResult`].

use crate::{
    config::{RhaiConfig, SandboxConfig},
    engine::{
        rhai::SyntaxValidator,
        sandbox::{Emitter, Sandbox, SandboxRequest},
        stats::StatsTracker,
    },
    models::{
        ErrorKind, ExecutionContext, ExecutionError, ExecutionResult, ExecutionStats, ScriptConfig,
        SyntaxCheck,
    },
};

/// Executes scripts in fresh sandboxes and keeps statistics.
#[derive(Debug)]
pub struct ScriptExecutor {
    sandbox: Sandbox,
    validator: SyntaxValidator,
    stats: StatsTracker,
}

impl ScriptExecutor {
    /// Creates an executor.
    pub fn new(sandbox_config: SandboxConfig, rhai_config: RhaiConfig, syntax_cache_capacity: usize) -> Self {
        Self {
            validator: SyntaxValidator::new(&rhai_config, syntax_cache_capacity),
            sandbox: Sandbox::new(sandbox_config, rhai_config),
            stats: StatsTracker::new(),
        }
    }

    /// The sandbox factory.
    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Runs `config.code` with `context` bound. Script failures are reported
    /// in the result, never as an error.
    pub async fn execute(&self, config: ScriptConfig, context: Option<ExecutionContext>) -> ExecutionResult {
        self.execute_with_emitter(config, context, Emitter::disabled()).await
    }

    /// Like [`ScriptExecutor::execute`], routing `emit(value)` to `emitter`.
    #[tracing::instrument(skip_all, level = "debug", fields(context = context.as_ref().map(|c| c.id.as_str())))]
    pub async fn execute_with_emitter(
        &self,
        config: ScriptConfig,
        context: Option<ExecutionContext>,
        emitter: Emitter,
    ) -> ExecutionResult {
        let guard = self.stats.begin();

        let check = self.validator.validate(&config.code);
        if !check.valid {
            let message = check.error.unwrap_or_else(|| "Invalid syntax".to_string());
            let elapsed = guard.elapsed_ms();
            guard.finish(false, elapsed);
            tracing::debug!(error = %message, "Syntax pre-check failed");
            return ExecutionResult::failure(ExecutionError::new(ErrorKind::Syntax, message), elapsed, Vec::new())
                .with_context_snapshot(context);
        }

        let handle = self.sandbox.create_sandbox(
            SandboxRequest::new(&config).with_context(context.as_ref()).with_emitter(emitter),
        );
        let logs = handle.logs();
        let outcome = self.sandbox.execute_in_sandbox(config.code, handle, config.timeout).await;
        let elapsed = guard.elapsed_ms();

        let result = match outcome {
            Ok(output) => {
                guard.finish(true, elapsed);
                ExecutionResult::success(output.value, elapsed, output.logs)
            }
            Err(err) => {
                guard.finish(false, elapsed);
                tracing::debug!(kind = %err.kind(), error = %err, "Script execution failed");
                ExecutionResult::failure(err.into(), elapsed, logs.snapshot())
            }
        };

        result.with_context_snapshot(context)
    }

    /// Checks that `code` parses.
    pub fn validate_syntax(&self, code: &str) -> SyntaxCheck {
        self.validator.validate(code)
    }

    /// Statistics since start or the last clear.
    pub fn get_execution_stats(&self) -> ExecutionStats {
        self.stats.snapshot()
    }

    /// Resets the statistics.
    pub fn clear_stats(&self) {
        self.stats.clear();
    }

    /// Replaces the statistics with imported totals.
    pub fn restore_stats(&self, stats: &ExecutionStats) {
        self.stats.restore(stats);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;

    use super::*;

    fn executor() -> ScriptExecutor {
        ScriptExecutor::new(SandboxConfig::default(), RhaiConfig::default(), 64)
    }

    #[tokio::test]
    async fn test_successful_execution() {
        let executor = executor();
        let result = executor.execute(ScriptConfig::new("return 1 + 1;"), None).await;
        assert!(result.success);
        assert_eq!(result.data, json!(2));
        assert!(result.error.is_none());
        assert!(result.execution_time >= 0.0);

        let stats = executor.get_execution_stats();
        assert_eq!(stats.total_executions, 1);
        assert_eq!(stats.successful_executions, 1);
    }

    #[tokio::test]
    async fn test_syntax_error_is_reported() {
        let executor = executor();
        let result = executor.execute(ScriptConfig::new("let = 5"), None).await;
        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ErrorKind::Syntax));
        assert_eq!(executor.get_execution_stats().failed_executions, 1);
    }

    #[tokio::test]
    async fn test_security_violation_is_reported() {
        let result = executor().execute(ScriptConfig::new("eval('1')"), None).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::SecurityViolation));
    }

    #[tokio::test]
    async fn test_context_snapshot_is_attached() {
        let context = ExecutionContext::new("ctx_1", "one").with_variable("limit", json!(3));
        let result = executor().execute(ScriptConfig::new("limit * 2"), Some(context.clone())).await;
        assert_eq!(result.data, json!(6));
        assert_eq!(result.context_snapshot, Some(context));
    }

    #[tokio::test]
    async fn test_logs_are_kept_on_failure() {
        let result = executor()
            .execute(ScriptConfig::new(r#"console.warn("careful"); throw "stop";"#), None)
            .await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Runtime));
        assert_eq!(result.logs, vec!["[warn] careful".to_string()]);
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let config = ScriptConfig::new("timers.sleep(2000); 1").with_timeout(Duration::from_millis(50));
        let result = executor().execute(config, None).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_concurrent_accounting() {
        let executor = Arc::new(executor());
        let mut handles = Vec::new();
        for i in 0..20 {
            let executor = executor.clone();
            let code = if i % 4 == 0 { "throw 1;".to_string() } else { format!("return {i};") };
            handles.push(tokio::spawn(async move { executor.execute(ScriptConfig::new(code), None).await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = executor.get_execution_stats();
        assert_eq!(stats.total_executions, 20);
        assert_eq!(stats.successful_executions, 15);
        assert_eq!(stats.failed_executions, 5);
        assert_eq!(stats.current_concurrent_executions, 0);
    }

    #[tokio::test]
    async fn test_clear_stats() {
        let executor = executor();
        executor.execute(ScriptConfig::new("1"), None).await;
        executor.clear_stats();
        assert_eq!(executor.get_execution_stats(), ExecutionStats::default());
    }

    #[test]
    fn test_validate_syntax() {
        let executor = executor();
        assert!(executor.validate_syntax("let x = 1;").valid);
        assert!(!executor.validate_syntax("let x = ").valid);
    }
}
