//! Placeholder substitution.
//!
//! Substitution is a pure text transformation: validated values are rendered
//! as script literals and spliced into every matching `{{name}}`.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write,
    sync::LazyLock,
};

use regex::{Captures, Regex};
use serde_json::Value;

use crate::models::ParameterType;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("invalid placeholder pattern")
});

/// Names of every placeholder in `code`.
pub fn placeholders(code: &str) -> BTreeSet<String> {
    PLACEHOLDER.captures_iter(code).map(|caps| caps[1].to_string()).collect()
}

/// Replaces every `{{name}}` with `resolved[name]`. Placeholders without a
/// resolved value are left as they are.
pub fn substitute(template: &str, resolved: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match resolved.get(&caps[1]) {
            Some(literal) => literal.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Renders a parameter value as script source.
///
/// Function parameters given as strings are inserted verbatim; everything
/// else becomes a literal.
pub fn to_script_literal(value: &Value, param_type: ParameterType) -> String {
    match (param_type, value) {
        (ParameterType::Function, Value::String(source)) => source.clone(),
        _ => render_literal(value),
    }
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "()".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or(0.0);
                if f.fract() == 0.0 && f.abs() < 1e15 { format!("{f:.1}") } else { f.to_string() }
            }
        }
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(render_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<_> =
                map.iter().map(|(key, value)| format!("{}: {}", quote(key), render_literal(value))).collect();
            format!("#{{{}}}", entries.join(", "))
        }
    }
}

/// Quotes `text` as a double-quoted string literal.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_placeholders_are_collected() {
        let names = placeholders("let a = {{alpha}}; let b = {{ beta }}; {{alpha}}");
        assert_eq!(names, BTreeSet::from(["alpha".to_string(), "beta".to_string()]));
    }

    #[test]
    fn test_every_occurrence_is_replaced() {
        let resolved = BTreeMap::from([("n".to_string(), "3".to_string())]);
        assert_eq!(substitute("{{n}} + {{ n }}", &resolved), "3 + 3");
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let resolved = BTreeMap::new();
        assert_eq!(substitute("x = {{missing}}", &resolved), "x = {{missing}}");
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let resolved = BTreeMap::from([
            ("a".to_string(), "\"{{b}}\"".to_string()),
            ("b".to_string(), "1".to_string()),
        ]);
        assert_eq!(substitute("{{a}}", &resolved), "\"{{b}}\"");
    }

    #[test]
    fn test_string_literals_are_escaped() {
        let literal = to_script_literal(&json!("say \"hi\"\n\\ \u{1}"), ParameterType::String);
        assert_eq!(literal, r#""say \"hi\"\n\\ \u0001""#);
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(to_script_literal(&json!(42), ParameterType::Number), "42");
        assert_eq!(to_script_literal(&json!(-1.5), ParameterType::Number), "-1.5");
        assert_eq!(to_script_literal(&json!(3.0), ParameterType::Number), "3.0");
    }

    #[test]
    fn test_structured_literals() {
        let value = json!({"name": "a", "tags": [1, true, null]});
        assert_eq!(
            to_script_literal(&value, ParameterType::Object),
            r##"#{"name": "a", "tags": [1, true, ()]}"##
        );
    }

    #[test]
    fn test_function_source_is_raw() {
        assert_eq!(to_script_literal(&json!("|x| x * 2"), ParameterType::Function), "|x| x * 2");
    }
}
