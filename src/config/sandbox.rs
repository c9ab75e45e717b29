use std::{collections::BTreeSet, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::engine::sandbox::Capability;

/// A caller-supplied check over raw script source. Returning `Some(issue)`
/// marks the script unsafe.
#[derive(Clone)]
pub struct SecurityPredicate(Arc<dyn Fn(&str) -> Option<String> + Send + Sync>);

impl SecurityPredicate {
    /// Wraps a closure as a security predicate.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    /// Runs the predicate against `code`.
    pub fn check(&self, code: &str) -> Option<String> {
        (self.0)(code)
    }
}

impl fmt::Debug for SecurityPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityPredicate(..)")
    }
}

/// Capability policy applied to every sandbox the engine creates.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SandboxConfig {
    /// Capabilities bound into each sandbox.
    #[serde(default = "default_allowed_globals")]
    pub allowed_globals: BTreeSet<Capability>,

    /// Names that may never be referenced. Wins over `allowed_globals`.
    #[serde(default = "default_blocked_globals")]
    pub blocked_globals: BTreeSet<String>,

    /// Permits dynamic code evaluation.
    #[serde(default)]
    pub allow_eval: bool,

    /// Permits dynamic function construction.
    #[serde(default)]
    pub allow_function: bool,

    /// Permits prototype-chain identifiers and lets scripts reassign
    /// capability bindings.
    #[serde(default)]
    pub allow_prototype_pollution: bool,

    /// Optional extra check over raw source text.
    #[serde(skip)]
    pub security_predicate: Option<SecurityPredicate>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            allowed_globals: default_allowed_globals(),
            blocked_globals: default_blocked_globals(),
            allow_eval: false,
            allow_function: false,
            allow_prototype_pollution: false,
            security_predicate: None,
        }
    }
}

impl SandboxConfig {
    /// Returns a copy of this policy with an additional source check.
    pub fn with_security_predicate(mut self, predicate: SecurityPredicate) -> Self {
        self.security_predicate = Some(predicate);
        self
    }
}

fn default_allowed_globals() -> BTreeSet<Capability> {
    Capability::ALL.into_iter().collect()
}

fn default_blocked_globals() -> BTreeSet<String> {
    [
        "eval",
        "Function",
        "globalThis",
        "global",
        "window",
        "process",
        "require",
        "module",
        "exports",
        "__proto__",
        "constructor",
        "prototype",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
