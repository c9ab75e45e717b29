//! Contexts every engine starts with.

use serde_json::json;

use crate::models::{ExecutionContext, ScriptFunction};

/// Identifier of the context bound when a caller supplies none.
pub const DEFAULT_CONTEXT_ID: &str = "default";
/// Identifier of the validation helpers context.
pub const DATA_VALIDATION_CONTEXT_ID: &str = "data-validation";
/// Identifier of the device message helpers context.
pub const DEVICE_MESSAGE_CONTEXT_ID: &str = "device-message";

/// Builds the seed contexts in creation order.
pub fn seed_contexts() -> Vec<ExecutionContext> {
    vec![default_context(), data_validation_context(), device_message_context()]
}

fn default_context() -> ExecutionContext {
    ExecutionContext::new(DEFAULT_CONTEXT_ID, "Default")
        .with_variable("appName", json!("Dashboard Studio"))
        .with_variable("version", json!("1.0.0"))
        .with_variable("environment", json!("production"))
        .with_function(
            "formatNumber",
            ScriptFunction::new(
                ["value", "decimals"],
                "let factor = 10.0 ** decimals;\n(value * factor).round() / factor",
            ),
        )
        .with_function(
            "clamp",
            ScriptFunction::new(
                ["value", "low", "high"],
                "if value < low { low } else if value > high { high } else { value }",
            ),
        )
        .with_function(
            "percentage",
            ScriptFunction::new(["part", "total"], "if total == 0 { 0.0 } else { part * 100.0 / total }"),
        )
}

fn data_validation_context() -> ExecutionContext {
    ExecutionContext::new(DATA_VALIDATION_CONTEXT_ID, "Data Validation")
        .with_variable(
            "rules",
            json!({
                "minTemperature": -40,
                "maxTemperature": 85,
                "requiredFields": ["id", "timestamp", "value"]
            }),
        )
        .with_function(
            "isNumber",
            ScriptFunction::new(["value"], r#"type_of(value) == "i64" || type_of(value) == "f64""#),
        )
        .with_function(
            "inRange",
            ScriptFunction::new(["value", "low", "high"], "value >= low && value <= high"),
        )
        .with_function(
            "hasFields",
            ScriptFunction::new(
                ["record", "fields"],
                "for field in fields {\n    if !(field in record) { return false; }\n}\ntrue",
            ),
        )
}

fn device_message_context() -> ExecutionContext {
    ExecutionContext::new(DEVICE_MESSAGE_CONTEXT_ID, "Device Message")
        .with_variable("messageFormat", json!("json"))
        .with_variable("deviceTypes", json!(["sensor", "gateway", "actuator"]))
        .with_variable("defaultQos", json!(1))
        .with_function(
            "parseReading",
            ScriptFunction::new(
                ["message"],
                "#{ device: message.deviceId, value: message.payload.value, ts: message.timestamp }",
            ),
        )
        .with_function("normalizeTopic", ScriptFunction::new(["topic"], "topic.to_lower()"))
}
