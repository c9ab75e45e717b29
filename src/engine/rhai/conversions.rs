//! Data conversion utilities between JSON values and the Rhai scripting engine.
//!
//! Context variables travel as `serde_json::Value` everywhere outside the
//! sandbox; these helpers move them in and out of Rhai's `Dynamic`.

use rhai::{Array, Dynamic, EvalAltResult, Map};
use serde_json::Value;

/// Converts a JSON value to a Rhai `Dynamic` value.
///
/// Unsigned integers above `i64::MAX` are converted to floats, which is what
/// a JavaScript-style number would have become anyway.
pub fn json_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => (*b).into(),
        Value::Number(n) =>
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(f) = n.as_f64() {
                f.into()
            } else {
                n.to_string().into()
            },
        Value::String(s) => s.clone().into(),
        Value::Array(arr) => {
            let rhai_array: Array = arr.iter().map(json_to_dynamic).collect();
            rhai_array.into()
        }
        Value::Object(obj) => {
            let mut rhai_map = Map::new();
            for (k, v) in obj {
                rhai_map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            rhai_map.into()
        }
    }
}

/// Converts a Rhai `Dynamic` value to JSON.
///
/// Values without a JSON counterpart (function pointers, capability objects)
/// are rendered as their display string.
pub fn dynamic_to_json(dynamic: &Dynamic) -> Value {
    if dynamic.is_unit() {
        return Value::Null;
    }

    if let Some(value) = try_convert_primitive(dynamic) {
        return value;
    }

    if let Some(value) = try_convert_array(dynamic) {
        return value;
    }

    if let Some(value) = try_convert_map(dynamic) {
        return value;
    }

    Value::String(dynamic.to_string())
}

/// Attempts to convert a Rhai Dynamic to a JSON primitive type.
fn try_convert_primitive(dynamic: &Dynamic) -> Option<Value> {
    if let Ok(b) = dynamic.as_bool() {
        Some(Value::Bool(b))
    } else if let Ok(i) = dynamic.as_int() {
        Some(Value::Number(i.into()))
    } else if let Ok(f) = dynamic.as_float() {
        // NaN and infinities have no JSON representation.
        Some(serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
    } else if let Ok(c) = dynamic.as_char() {
        Some(Value::String(c.to_string()))
    } else if dynamic.is_string() {
        dynamic.clone().into_string().ok().map(Value::String)
    } else {
        None
    }
}

/// Attempts to convert a Rhai Dynamic array to a JSON array.
fn try_convert_array(dynamic: &Dynamic) -> Option<Value> {
    dynamic.read_lock::<Array>().map(|arr| {
        let json_array: Vec<Value> = arr.iter().map(dynamic_to_json).collect();
        Value::Array(json_array)
    })
}

/// Attempts to convert a Rhai Dynamic map to a JSON object.
fn try_convert_map(dynamic: &Dynamic) -> Option<Value> {
    dynamic.read_lock::<Map>().map(|map| {
        let json_map: serde_json::Map<String, Value> = map
            .iter()
            .map(|(key, value)| (key.to_string(), dynamic_to_json(value)))
            .collect();
        Value::Object(json_map)
    })
}

/// Renders a value the way console-style output shows it: strings verbatim,
/// everything else as compact JSON.
pub fn display_dynamic(dynamic: &Dynamic) -> String {
    match dynamic_to_json(dynamic) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Reads a numeric script value as `f64`.
pub fn dynamic_to_f64(value: &Dynamic) -> Result<f64, Box<EvalAltResult>> {
    if let Ok(i) = value.as_int() {
        Ok(i as f64)
    } else if let Ok(f) = value.as_float() {
        Ok(f)
    } else {
        Err(format!("Expected a number, got {}", value.type_name()).into())
    }
}
