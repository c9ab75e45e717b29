//! Execution contexts: named bundles of variables and functions bound into a
//! sandbox.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function stored in a context. Functions are immutable, so clones of a
/// context share them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptFunction {
    /// Ordered parameter names.
    #[serde(default)]
    pub params: Vec<String>,

    /// Function body in script syntax.
    pub body: String,
}

impl ScriptFunction {
    /// Creates a function from its parameter names and body.
    pub fn new<I, S>(params: I, body: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { params: params.into_iter().map(Into::into).collect(), body: body.into() }
    }

    /// Renders the function as a script definition named `name`.
    pub fn to_definition(&self, name: &str) -> String {
        format!("fn {}({}) {{\n{}\n}}", name, self.params.join(", "), self.body)
    }
}

/// A named, independently addressable set of variables and functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    /// Unique identifier.
    pub id: String,

    /// Human readable name.
    pub name: String,

    /// Variables bound into the sandbox by name.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    /// Functions defined in the sandbox by name.
    #[serde(default)]
    pub functions: BTreeMap<String, Arc<ScriptFunction>>,

    /// Timestamp when the context was created.
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,

    /// Timestamp when the context was last modified.
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Provides a default timestamp for serde deserialization
fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl ExecutionContext {
    /// Creates an empty context with the given identity.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            variables: BTreeMap::new(),
            functions: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds or replaces a variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Adds or replaces a function.
    pub fn with_function(mut self, name: impl Into<String>, function: ScriptFunction) -> Self {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }
}

/// A partial update applied by the context manager. Present variables and
/// functions are inserted or overwritten; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUpdate {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,

    /// Variables to upsert.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    /// Functions to upsert.
    #[serde(default)]
    pub functions: BTreeMap<String, ScriptFunction>,
}
