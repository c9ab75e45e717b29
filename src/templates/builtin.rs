//! The read-only system template catalogue.

use chrono::Utc;
use serde_json::json;

use crate::models::{ParameterType, ParameterValidation, ScriptTemplate, TemplateCategory, TemplateParameter};

fn system_template(
    id: &str,
    name: &str,
    category: TemplateCategory,
    description: &str,
    code: &str,
    parameters: Vec<TemplateParameter>,
) -> ScriptTemplate {
    let now = Utc::now();
    ScriptTemplate {
        id: id.to_string(),
        name: name.to_string(),
        category,
        description: description.to_string(),
        code: code.trim_start().to_string(),
        parameters,
        is_system: true,
        created_at: now,
        updated_at: now,
    }
}

fn range(min: f64, max: f64) -> ParameterValidation {
    ParameterValidation { min: Some(min), max: Some(max), ..Default::default() }
}

fn one_of(values: &[&str]) -> ParameterValidation {
    ParameterValidation { allowed: Some(values.iter().map(|v| json!(v)).collect()), ..Default::default() }
}

const RANDOM_DATA_GENERATOR: &str = r#"
let count = {{count}};
let fields = {{fields}};
let low = {{min}};
let high = {{max}};
let records = [];
for i in 0..count {
    let record = #{};
    for field in fields {
        let name = field["name"];
        let kind = field["type"];
        record[name] = switch kind {
            "number" => { if name == "id" { i + 1 } else { random.number(low, high) } },
            "string" => random.string(field["length"] ?? 8),
            "boolean" => random.boolean(),
            "date" => random.date(),
            "pick" => random.pick(field["values"] ?? []),
            _ => { throw `Unsupported field type '${kind}' for field '${name}'`; }
        };
    }
    records.push(record);
}
records
"#;

const TIME_SERIES_GENERATOR: &str = r#"
let points = {{points}};
let step = {{intervalMinutes}} * 60000;
let base = {{baseValue}};
let spread = {{variance}};
let start = Date.now() - points * step;
let series = [];
for i in 0..points {
    series.push(#{
        timestamp: start + i * step,
        value: base + random.number(-spread, spread)
    });
}
series
"#;

const DATA_FILTER: &str = r#"
let items = {{data}};
let field = {{field}};
let op = {{operator}};
let threshold = {{threshold}};
let matched = [];
for item in items {
    let v = item[field];
    let keep = switch op {
        "eq" => v == threshold,
        "ne" => v != threshold,
        "gt" => v > threshold,
        "gte" => v >= threshold,
        "lt" => v < threshold,
        "lte" => v <= threshold,
        _ => false
    };
    if keep { matched.push(item); }
}
matched
"#;

const DATA_AGGREGATOR: &str = r#"
let items = {{data}};
let field = {{field}};
let operation = {{operation}};
let values = [];
for item in items {
    let v = item[field];
    if type_of(v) == "i64" || type_of(v) == "f64" { values.push(v); }
}
if values.is_empty() {
    return #{ operation: operation, result: 0, count: 0 };
}
let total = 0.0;
let lowest = values[0];
let highest = values[0];
for v in values {
    total += v;
    if v < lowest { lowest = v; }
    if v > highest { highest = v; }
}
let result = switch operation {
    "sum" => total,
    "avg" => total / values.len(),
    "min" => lowest,
    "max" => highest,
    _ => values.len()
};
#{ operation: operation, result: result, count: values.len() }
"#;

const OBJECT_PICKER: &str = r#"
data.pick({{source}}, {{keys}})
"#;

const API_RESPONSE_MOCK: &str = r#"
let status = {{status}};
#{
    status: status,
    ok: status >= 200 && status < 300,
    headers: #{ "content-type": "application/json" },
    body: {{payload}},
    receivedAt: Date.iso()
}
"#;

const DATE_RANGE: &str = r#"
let start = {{start}};
let days = {{days}};
let dates = [];
for i in 0..days {
    dates.push(time.format(time.add_days(start, i), {{format}}));
}
dates
"#;

/// Builds the system templates.
pub fn system_templates() -> Vec<ScriptTemplate> {
    vec![
        system_template(
            "random-data-generator",
            "Random Data Generator",
            TemplateCategory::DataGeneration,
            "Generates a list of records with one random value per declared field",
            RANDOM_DATA_GENERATOR,
            vec![
                TemplateParameter::new("count", ParameterType::Number)
                    .describe("Number of records")
                    .default_value(json!(10))
                    .validation(range(1.0, 1000.0)),
                TemplateParameter::new("fields", ParameterType::Array)
                    .describe(
                        "Record fields as {name, type}; type is number, string, boolean, date or pick. \
                         A number field named id counts up from 1.",
                    )
                    .default_value(json!([
                        {"name": "id", "type": "number"},
                        {"name": "label", "type": "string", "length": 8},
                        {"name": "value", "type": "number"},
                        {"name": "active", "type": "boolean"},
                        {"name": "createdAt", "type": "date"}
                    ]))
                    .validation(ParameterValidation { min: Some(1.0), ..Default::default() }),
                TemplateParameter::new("min", ParameterType::Number)
                    .describe("Lower bound of random number fields")
                    .default_value(json!(0)),
                TemplateParameter::new("max", ParameterType::Number)
                    .describe("Upper bound of random number fields")
                    .default_value(json!(100)),
            ],
        ),
        system_template(
            "time-series-generator",
            "Time Series Generator",
            TemplateCategory::TimeSeries,
            "Generates evenly spaced points ending now",
            TIME_SERIES_GENERATOR,
            vec![
                TemplateParameter::new("points", ParameterType::Number)
                    .describe("Number of points")
                    .default_value(json!(24))
                    .validation(range(1.0, 10_000.0)),
                TemplateParameter::new("intervalMinutes", ParameterType::Number)
                    .describe("Minutes between points")
                    .default_value(json!(60))
                    .validation(range(1.0, 10_080.0)),
                TemplateParameter::new("baseValue", ParameterType::Number)
                    .describe("Centre of the generated values")
                    .default_value(json!(50)),
                TemplateParameter::new("variance", ParameterType::Number)
                    .describe("Maximum deviation from the base value")
                    .default_value(json!(10))
                    .validation(ParameterValidation { min: Some(0.0), ..Default::default() }),
            ],
        ),
        system_template(
            "data-filter",
            "Data Filter",
            TemplateCategory::DataProcessing,
            "Keeps the items whose field compares true against a threshold",
            DATA_FILTER,
            vec![
                TemplateParameter::new("data", ParameterType::Array).describe("Items to filter").required(),
                TemplateParameter::new("field", ParameterType::String).describe("Field to compare").required(),
                TemplateParameter::new("operator", ParameterType::String)
                    .describe("Comparison operator")
                    .default_value(json!("eq"))
                    .validation(one_of(&["eq", "ne", "gt", "gte", "lt", "lte"])),
                TemplateParameter::new("threshold", ParameterType::Number)
                    .describe("Value to compare against")
                    .required(),
            ],
        ),
        system_template(
            "data-aggregator",
            "Data Aggregator",
            TemplateCategory::DataProcessing,
            "Aggregates a numeric field over a list of items",
            DATA_AGGREGATOR,
            vec![
                TemplateParameter::new("data", ParameterType::Array).describe("Items to aggregate").required(),
                TemplateParameter::new("field", ParameterType::String)
                    .describe("Numeric field to aggregate")
                    .required(),
                TemplateParameter::new("operation", ParameterType::String)
                    .describe("Aggregation to apply")
                    .default_value(json!("sum"))
                    .validation(one_of(&["sum", "avg", "min", "max", "count"])),
            ],
        ),
        system_template(
            "object-picker",
            "Object Picker",
            TemplateCategory::Utility,
            "Returns an object containing only the listed keys",
            OBJECT_PICKER,
            vec![
                TemplateParameter::new("source", ParameterType::Object).describe("Object to pick from").required(),
                TemplateParameter::new("keys", ParameterType::Array)
                    .describe("Keys to keep")
                    .required()
                    .validation(ParameterValidation { min: Some(1.0), ..Default::default() }),
            ],
        ),
        system_template(
            "api-response-mock",
            "API Response Mock",
            TemplateCategory::ApiIntegration,
            "Builds a response envelope around a payload",
            API_RESPONSE_MOCK,
            vec![
                TemplateParameter::new("status", ParameterType::Number)
                    .describe("HTTP status code")
                    .default_value(json!(200))
                    .validation(range(100.0, 599.0)),
                TemplateParameter::new("payload", ParameterType::Object)
                    .describe("Response body")
                    .default_value(json!({})),
            ],
        ),
        system_template(
            "date-range",
            "Date Range",
            TemplateCategory::Utility,
            "Lists consecutive dates starting from a given day",
            DATE_RANGE,
            vec![
                TemplateParameter::new("start", ParameterType::String)
                    .describe("First day, YYYY-MM-DD")
                    .required()
                    .validation(ParameterValidation {
                        pattern: Some(r"^\d{4}-\d{2}-\d{2}$".to_string()),
                        ..Default::default()
                    }),
                TemplateParameter::new("days", ParameterType::Number)
                    .describe("Number of days")
                    .default_value(json!(7))
                    .validation(range(1.0, 366.0)),
                TemplateParameter::new("format", ParameterType::String)
                    .describe("strftime pattern of each entry")
                    .default_value(json!("%Y-%m-%d")),
            ],
        ),
    ]
}
