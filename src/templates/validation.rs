//! Parameter resolution and validation.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{ParameterType, ParameterValidation, TemplateParameter};

/// A parameter failed validation. Always names the offending parameter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterValidationError {
    /// A required parameter had no value and no default.
    #[error("Missing required parameter '{name}'")]
    Missing {
        /// Parameter name.
        name: String,
    },

    /// A supplied value names no declared parameter.
    #[error("Unknown parameter '{name}'")]
    Unknown {
        /// Supplied name.
        name: String,
    },

    /// The value has the wrong JSON type.
    #[error("Parameter '{name}' must be of type {expected}, got {actual}")]
    TypeMismatch {
        /// Parameter name.
        name: String,
        /// Declared type.
        expected: ParameterType,
        /// JSON type of the supplied value.
        actual: &'static str,
    },

    /// Number or length below `min`.
    #[error("Parameter '{name}' {measure} {actual} is below the minimum of {min}")]
    BelowMinimum {
        /// Parameter name.
        name: String,
        /// `value` or `length`.
        measure: &'static str,
        /// Measured value.
        actual: f64,
        /// Bound.
        min: f64,
    },

    /// Number or length above `max`.
    #[error("Parameter '{name}' {measure} {actual} is above the maximum of {max}")]
    AboveMaximum {
        /// Parameter name.
        name: String,
        /// `value` or `length`.
        measure: &'static str,
        /// Measured value.
        actual: f64,
        /// Bound.
        max: f64,
    },

    /// String does not match the declared pattern.
    #[error("Parameter '{name}' does not match pattern '{pattern}'")]
    PatternMismatch {
        /// Parameter name.
        name: String,
        /// Declared pattern.
        pattern: String,
    },

    /// The declared pattern is not a valid regular expression.
    #[error("Parameter '{name}' has an invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Parameter name.
        name: String,
        /// Declared pattern.
        pattern: String,
        /// Regex compile error.
        reason: String,
    },

    /// Value is not one of the allowed values.
    #[error("Parameter '{name}' must be one of {allowed}")]
    NotAllowed {
        /// Parameter name.
        name: String,
        /// Allowed values as JSON.
        allowed: String,
    },
}

impl ParameterValidationError {
    /// Name of the offending parameter.
    pub fn parameter(&self) -> &str {
        match self {
            ParameterValidationError::Missing { name }
            | ParameterValidationError::Unknown { name }
            | ParameterValidationError::TypeMismatch { name, .. }
            | ParameterValidationError::BelowMinimum { name, .. }
            | ParameterValidationError::AboveMaximum { name, .. }
            | ParameterValidationError::PatternMismatch { name, .. }
            | ParameterValidationError::InvalidPattern { name, .. }
            | ParameterValidationError::NotAllowed { name, .. } => name,
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn matches_type(value: &Value, param_type: ParameterType) -> bool {
    matches!(
        (param_type, value),
        (ParameterType::String, Value::String(_))
            | (ParameterType::Number, Value::Number(_))
            | (ParameterType::Boolean, Value::Bool(_))
            | (ParameterType::Object, Value::Object(_))
            | (ParameterType::Array, Value::Array(_))
            | (ParameterType::Function, Value::String(_))
    )
}

/// Resolves the effective value of every declared parameter and validates
/// it, stopping at the first violation.
///
/// A supplied `null` counts as absent. Optional parameters without a value
/// or default resolve to `null`. Supplied names that match no declared
/// parameter are rejected.
pub fn resolve_parameters(
    declared: &[TemplateParameter],
    supplied: &Map<String, Value>,
) -> Result<BTreeMap<String, Value>, ParameterValidationError> {
    if let Some(name) = supplied.keys().find(|key| !declared.iter().any(|p| &p.name == *key)) {
        return Err(ParameterValidationError::Unknown { name: name.clone() });
    }

    let mut resolved = BTreeMap::new();
    for parameter in declared {
        let value = supplied
            .get(&parameter.name)
            .filter(|value| !value.is_null())
            .or_else(|| parameter.default_value.as_ref().filter(|value| !value.is_null()));

        let Some(value) = value else {
            if parameter.required {
                return Err(ParameterValidationError::Missing { name: parameter.name.clone() });
            }
            resolved.insert(parameter.name.clone(), Value::Null);
            continue;
        };

        validate_value(parameter, value)?;
        resolved.insert(parameter.name.clone(), value.clone());
    }
    Ok(resolved)
}

/// Checks one value against the parameter's type and constraints.
pub fn validate_value(parameter: &TemplateParameter, value: &Value) -> Result<(), ParameterValidationError> {
    let name = &parameter.name;
    if !matches_type(value, parameter.param_type) {
        return Err(ParameterValidationError::TypeMismatch {
            name: name.clone(),
            expected: parameter.param_type,
            actual: json_type(value),
        });
    }

    let Some(rules) = &parameter.validation else {
        return Ok(());
    };

    check_bounds(name, value, rules)?;

    if let (Some(pattern), Value::String(text)) = (&rules.pattern, value) {
        let regex = compile_pattern(name, pattern)?;
        if !regex.is_match(text) {
            return Err(ParameterValidationError::PatternMismatch {
                name: name.clone(),
                pattern: pattern.clone(),
            });
        }
    }

    if let Some(allowed) = &rules.allowed {
        if !allowed.contains(value) {
            return Err(ParameterValidationError::NotAllowed {
                name: name.clone(),
                allowed: Value::Array(allowed.clone()).to_string(),
            });
        }
    }

    Ok(())
}

/// Compiles a declared pattern, naming the parameter on failure.
pub fn compile_pattern(name: &str, pattern: &str) -> Result<Regex, ParameterValidationError> {
    Regex::new(pattern).map_err(|err| ParameterValidationError::InvalidPattern {
        name: name.to_string(),
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

fn check_bounds(name: &str, value: &Value, rules: &ParameterValidation) -> Result<(), ParameterValidationError> {
    let (measure, actual) = match value {
        Value::Number(n) => ("value", n.as_f64().unwrap_or(0.0)),
        Value::String(s) => ("length", s.chars().count() as f64),
        Value::Array(items) => ("length", items.len() as f64),
        _ => return Ok(()),
    };

    if let Some(min) = rules.min {
        if actual < min {
            return Err(ParameterValidationError::BelowMinimum { name: name.to_string(), measure, actual, min });
        }
    }
    if let Some(max) = rules.max {
        if actual > max {
            return Err(ParameterValidationError::AboveMaximum { name: name.to_string(), measure, actual, max });
        }
    }
    Ok(())
}
