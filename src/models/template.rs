//! Parameterized script templates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Catalogue grouping for templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateCategory {
    /// Produces synthetic data.
    DataGeneration,
    /// Transforms data passed in as parameters.
    DataProcessing,
    /// Produces time-indexed series.
    TimeSeries,
    /// Shapes payloads for external APIs.
    ApiIntegration,
    /// Small helpers.
    Utility,
    /// Anything else.
    Custom,
}

impl TemplateCategory {
    /// The wire name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::DataGeneration => "data-generation",
            TemplateCategory::DataProcessing => "data-processing",
            TemplateCategory::TimeSeries => "time-series",
            TemplateCategory::ApiIntegration => "api-integration",
            TemplateCategory::Utility => "utility",
            TemplateCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TemplateCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data-generation" => Ok(TemplateCategory::DataGeneration),
            "data-processing" => Ok(TemplateCategory::DataProcessing),
            "time-series" => Ok(TemplateCategory::TimeSeries),
            "api-integration" => Ok(TemplateCategory::ApiIntegration),
            "utility" => Ok(TemplateCategory::Utility),
            "custom" => Ok(TemplateCategory::Custom),
            other => Err(format!("Unknown template category '{other}'")),
        }
    }
}

/// Declared type of a template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Substituted as a quoted string literal.
    String,
    /// Substituted as a numeric literal.
    Number,
    /// Substituted as `true`/`false`.
    Boolean,
    /// Substituted as an object map literal.
    Object,
    /// Substituted as an array literal.
    Array,
    /// Substituted as raw source text.
    Function,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Boolean => "boolean",
            ParameterType::Object => "object",
            ParameterType::Array => "array",
            ParameterType::Function => "function",
        };
        f.write_str(name)
    }
}

/// Optional constraints on a parameter value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterValidation {
    /// Lower bound: value for numbers, length for strings and arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound: value for numbers, length for strings and arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Regular expression a string value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Closed set of accepted values.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

/// A named placeholder declared by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateParameter {
    /// Placeholder name, used as `{{name}}` in the template code.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    /// What the parameter controls.
    #[serde(default)]
    pub description: String,
    /// Whether a value must be supplied when there is no default.
    #[serde(default)]
    pub required: bool,
    /// Value used when the caller supplies none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Additional constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ParameterValidation>,
}

impl TemplateParameter {
    /// Creates an optional parameter without default or constraints.
    pub fn new(name: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            required: false,
            default_value: None,
            validation: None,
        }
    }

    /// Marks the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the default value.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Sets the validation block.
    pub fn validation(mut self, validation: ParameterValidation) -> Self {
        self.validation = Some(validation);
        self
    }
}

/// A stored template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptTemplate {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Catalogue grouping.
    pub category: TemplateCategory,
    /// What the template produces.
    #[serde(default)]
    pub description: String,
    /// Script source containing `{{name}}` placeholders.
    pub code: String,
    /// Declared parameters, in display order.
    #[serde(default)]
    pub parameters: Vec<TemplateParameter>,
    /// System templates are read-only.
    #[serde(default)]
    pub is_system: bool,
    /// Timestamp when the template was created.
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Timestamp when the template was last modified.
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Provides a default timestamp for serde deserialization
fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Caller-supplied fields for a new user template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    /// Display name.
    pub name: String,
    /// Catalogue grouping.
    #[serde(default = "default_category")]
    pub category: TemplateCategory,
    /// What the template produces.
    #[serde(default)]
    pub description: String,
    /// Script source containing `{{name}}` placeholders.
    pub code: String,
    /// Declared parameters.
    #[serde(default)]
    pub parameters: Vec<TemplateParameter>,
}

fn default_category() -> TemplateCategory {
    TemplateCategory::Custom
}

/// Partial update of a user template. `id` and `is_system` cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUpdate {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New category.
    #[serde(default)]
    pub category: Option<TemplateCategory>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New code.
    #[serde(default)]
    pub code: Option<String>,
    /// New parameter list.
    #[serde(default)]
    pub parameters: Option<Vec<TemplateParameter>>,
}
