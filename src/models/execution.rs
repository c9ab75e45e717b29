//! Execution outcomes, the inbound request contract and the aggregate
//! statistics the engine reports.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ExecutionContext;

/// Classification of an execution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The code failed pre-execution validation.
    #[serde(rename = "SyntaxError")]
    Syntax,
    /// Screening rejected the code, or it referenced a blocked name.
    SecurityViolation,
    /// The wall-clock or operation budget ran out.
    #[serde(rename = "TimeoutError")]
    Timeout,
    /// The script raised an error while running.
    #[serde(rename = "RuntimeError")]
    Runtime,
    /// A template parameter was missing or invalid.
    #[serde(rename = "ParameterValidationError")]
    ParameterValidation,
    /// No execution slot was available under the fail-fast policy.
    #[serde(rename = "CapacityError")]
    Capacity,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::SecurityViolation => "SecurityViolation",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::ParameterValidation => "ParameterValidationError",
            ErrorKind::Capacity => "CapacityError",
        };
        f.write_str(name)
    }
}

/// Structured error carried inside a failed [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionError {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Human readable message.
    pub message: String,
    /// Source location, when the evaluator reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ExecutionError {
    /// Creates an error without location information.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), stack: None }
    }

    /// Attaches location information.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of a single execution. Script-level failures are reported here
/// rather than as Rust errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Whether the script completed and produced a value.
    pub success: bool,
    /// Return value of the script, `null` on failure.
    #[serde(default)]
    pub data: Value,
    /// Failure details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
    /// Elapsed time in milliseconds.
    pub execution_time: f64,
    /// Captured console output, in emission order.
    #[serde(default)]
    pub logs: Vec<String>,
    /// Copy of the context the script ran with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_snapshot: Option<ExecutionContext>,
}

impl ExecutionResult {
    /// Builds a successful result.
    pub fn success(data: Value, execution_time: f64, logs: Vec<String>) -> Self {
        Self { success: true, data, error: None, execution_time, logs, context_snapshot: None }
    }

    /// Builds a failed result.
    pub fn failure(error: ExecutionError, execution_time: f64, logs: Vec<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(error),
            execution_time,
            logs,
            context_snapshot: None,
        }
    }

    /// Attaches the context snapshot.
    pub fn with_context_snapshot(mut self, snapshot: Option<ExecutionContext>) -> Self {
        self.context_snapshot = snapshot;
        self
    }

    /// Kind of the failure, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

/// Inbound call contract: inline code or a template, plus optional context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    /// Inline script source. Ignored when `template_id` is set.
    #[serde(default)]
    pub code: Option<String>,
    /// Inline variables, layered over the referenced context.
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
    /// Stored context to bind.
    #[serde(default)]
    pub context_id: Option<String>,
    /// Timeout override in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Template to generate the code from.
    #[serde(default)]
    pub template_id: Option<String>,
    /// Template parameters.
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
}

impl ExecutionRequest {
    /// A request for inline code.
    pub fn code(code: impl Into<String>) -> Self {
        Self { code: Some(code.into()), ..Default::default() }
    }

    /// A request for a template invocation.
    pub fn template(template_id: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            template_id: Some(template_id.into()),
            parameters: Some(parameters),
            ..Default::default()
        }
    }
}

/// Result of a syntax pre-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxCheck {
    /// Whether the code parsed.
    pub valid: bool,
    /// Parser message when it did not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of static security screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReport {
    /// True when no issue was found.
    pub safe: bool,
    /// Human readable description of every violation.
    pub issues: Vec<String>,
}

impl SecurityReport {
    /// Builds a report from a list of issues.
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self { safe: issues.is_empty(), issues }
    }
}

/// Event delivered by a streaming execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamEvent {
    /// A value passed to `emit` by the script.
    Partial {
        /// Zero-based position within the stream.
        sequence: u64,
        /// Emitted value.
        data: Value,
    },
    /// Final outcome; always the last event.
    Completed {
        /// The execution result.
        result: ExecutionResult,
    },
}

/// Aggregate statistics over the engine's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    /// Finished executions.
    pub total_executions: u64,
    /// Finished executions that succeeded.
    pub successful_executions: u64,
    /// Finished executions that failed.
    pub failed_executions: u64,
    /// Running mean of execution time in milliseconds.
    pub average_execution_time: f64,
    /// Executions currently in flight.
    pub current_concurrent_executions: u64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_error_kind_wire_names() {
        assert_eq!(serde_json::to_value(ErrorKind::Syntax).unwrap(), json!("SyntaxError"));
        assert_eq!(
            serde_json::to_value(ErrorKind::SecurityViolation).unwrap(),
            json!("SecurityViolation")
        );
        assert_eq!(serde_json::to_value(ErrorKind::Timeout).unwrap(), json!("TimeoutError"));
        let kind: ErrorKind = serde_json::from_value(json!("CapacityError")).unwrap();
        assert_eq!(kind, ErrorKind::Capacity);
        assert_eq!(ErrorKind::ParameterValidation.to_string(), "ParameterValidationError");
    }

    #[test]
    fn test_execution_result_wire_format() {
        let result = ExecutionResult::success(json!(2), 1.5, vec!["hello".into()]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"success": true, "data": 2, "executionTime": 1.5, "logs": ["hello"]}));

        let failed = ExecutionResult::failure(
            ExecutionError::new(ErrorKind::Runtime, "boom").with_stack("at line 1, position 5"),
            0.0,
            vec![],
        );
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["error"]["kind"], "RuntimeError");
        assert_eq!(value["error"]["stack"], "at line 1, position 5");
        assert_eq!(value["data"], Value::Null);
    }

    #[test]
    fn test_execution_request_parses_inbound_contract() {
        let request: ExecutionRequest = serde_json::from_value(json!({
            "templateId": "random-data-generator",
            "parameters": {"count": 3},
            "contextId": "default",
            "timeout": 1000
        }))
        .unwrap();
        assert_eq!(request.template_id.as_deref(), Some("random-data-generator"));
        assert_eq!(request.context_id.as_deref(), Some("default"));
        assert_eq!(request.timeout, Some(1000));
        assert!(request.code.is_none());
    }

    #[test]
    fn test_stream_event_tagging() {
        let partial = StreamEvent::Partial { sequence: 0, data: json!(1) };
        assert_eq!(
            serde_json::to_value(&partial).unwrap(),
            json!({"type": "partial", "sequence": 0, "data": 1})
        );
    }

    #[test]
    fn test_security_report_from_issues() {
        assert!(SecurityReport::from_issues(vec![]).safe);
        assert!(!SecurityReport::from_issues(vec!["bad".into()]).safe);
    }
}
