use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::helpers::{deserialize_duration_from_ms, serialize_duration_to_ms};

/// What happens to an execution request when every execution slot is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Wait for a slot; waiters are admitted in arrival order.
    #[default]
    Queue,
    /// Reject immediately with a capacity error.
    FailFast,
}

/// Engine-wide execution settings and the defaults applied to scripts that
/// do not override them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on evaluations in flight at the same time.
    #[serde(default = "default_max_concurrent_executions")]
    pub max_concurrent_executions: usize,

    /// Behaviour when `max_concurrent_executions` is reached.
    #[serde(default)]
    pub admission_policy: AdmissionPolicy,

    /// Timeout applied when a request does not carry its own.
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_duration_from_ms",
        serialize_with = "serialize_duration_to_ms"
    )]
    pub default_timeout: Duration,

    /// Advisory memory budget in bytes.
    #[serde(default = "default_max_memory")]
    pub default_max_memory: u64,

    /// Whether undeclared variables are rejected at compile time.
    #[serde(default = "default_true")]
    pub strict_mode: bool,

    /// Whether the `timers` capability is bound.
    #[serde(default = "default_true")]
    pub async_support: bool,

    /// Number of syntax check results kept before the cache is cleared.
    #[serde(default = "default_syntax_cache_capacity")]
    pub syntax_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: default_max_concurrent_executions(),
            admission_policy: AdmissionPolicy::default(),
            default_timeout: default_timeout(),
            default_max_memory: default_max_memory(),
            strict_mode: true,
            async_support: true,
            syntax_cache_capacity: default_syntax_cache_capacity(),
        }
    }
}

fn default_max_concurrent_executions() -> usize {
    10
}

fn default_timeout() -> Duration {
    Duration::from_millis(5_000)
}

fn default_max_memory() -> u64 {
    50 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_syntax_cache_capacity() -> usize {
    1_024
}
