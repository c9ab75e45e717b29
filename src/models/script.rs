//! Script-level request types: what to run and with which settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// A single execution request. Moved into the executor by value, so it cannot
/// change once an execution has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptConfig {
    /// Script source.
    pub code: String,

    /// Wall-clock budget, measured from sandbox entry.
    #[serde(
        default = "default_timeout",
        deserialize_with = "crate::config::deserialize_duration_from_ms",
        serialize_with = "crate::config::serialize_duration_to_ms"
    )]
    pub timeout: Duration,

    /// Advisory memory ceiling in bytes. Only used to cap string sizes.
    #[serde(default = "default_max_memory")]
    pub max_memory: u64,

    /// Rejects references to undeclared variables at compile time.
    #[serde(default = "default_true")]
    pub strict_mode: bool,

    /// Binds the `timers` capability.
    #[serde(default = "default_true")]
    pub async_support: bool,

    /// Lifts screening of network primitives.
    #[serde(default)]
    pub allow_network_access: bool,

    /// Lifts screening of filesystem primitives.
    #[serde(default)]
    pub allow_file_system_access: bool,
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_memory() -> u64 {
    50 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

impl ScriptConfig {
    /// Creates a config for `code` with the built-in defaults.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            timeout: default_timeout(),
            max_memory: default_max_memory(),
            strict_mode: true,
            async_support: true,
            allow_network_access: false,
            allow_file_system_access: false,
        }
    }

    /// Creates a config for `code` with the engine's configured defaults.
    pub fn from_engine_defaults(code: impl Into<String>, engine: &EngineConfig) -> Self {
        Self {
            code: code.into(),
            timeout: engine.default_timeout,
            max_memory: engine.default_max_memory,
            strict_mode: engine.strict_mode,
            async_support: engine.async_support,
            allow_network_access: false,
            allow_file_system_access: false,
        }
    }

    /// Overrides the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides strict mode.
    pub fn with_strict_mode(mut self, strict_mode: bool) -> Self {
        self.strict_mode = strict_mode;
        self
    }

    /// Overrides async support.
    pub fn with_async_support(mut self, async_support: bool) -> Self {
        self.async_support = async_support;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_config_defaults() {
        let config = ScriptConfig::new("return 1");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.strict_mode);
        assert!(config.async_support);
        assert!(!config.allow_network_access);
        assert!(!config.allow_file_system_access);
    }

    #[test]
    fn test_script_config_from_engine_defaults() {
        let engine = EngineConfig {
            default_timeout: Duration::from_millis(200),
            strict_mode: false,
            ..Default::default()
        };
        let config = ScriptConfig::from_engine_defaults("1", &engine);
        assert_eq!(config.timeout, Duration::from_millis(200));
        assert!(!config.strict_mode);
    }

    #[test]
    fn test_script_config_deserializes_camel_case() {
        let config: ScriptConfig = serde_json::from_str(
            r#"{"code": "1", "timeout": 750, "strictMode": false, "allowNetworkAccess": true}"#,
        )
        .unwrap();
        assert_eq!(config.timeout, Duration::from_millis(750));
        assert!(!config.strict_mode);
        assert!(config.allow_network_access);
        assert!(config.async_support);
    }
}
