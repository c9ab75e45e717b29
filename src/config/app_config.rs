use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::{EngineConfig, RhaiConfig, SandboxConfig, ServerConfig};

/// Provides the default value for database_url.
fn default_database_url() -> String {
    "sqlite:data/script_engine.db".to_string()
}

/// Provides the default value for state_key.
fn default_state_key() -> String {
    "engine_state".to_string()
}

/// Application configuration for the script engine service.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Database URL for the SQLite state store.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Key under which the engine state document is persisted.
    #[serde(default = "default_state_key")]
    pub state_key: String,

    /// Concurrency, admission and script defaults.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Rhai interpreter limits.
    #[serde(default)]
    pub rhai: RhaiConfig,

    /// Capability policy for sandboxes.
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            state_key: default_state_key(),
            engine: EngineConfig::default(),
            rhai: RhaiConfig::default(),
            sandbox: SandboxConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading `app.yaml` from the configuration
    /// directory, with `SCRIPT_ENGINE__*` environment variables layered on top.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)).required(false))
            .add_source(Environment::with_prefix("SCRIPT_ENGINE").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use tempfile::tempdir;

    use super::*;
    use crate::config::AdmissionPolicy;

    #[test]
    fn test_app_config_from_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("app.yaml"),
            r#"
database_url: "sqlite::memory:"
state_key: "test_state"
engine:
  max_concurrent_executions: 4
  admission_policy: fail_fast
  default_timeout: 1500
rhai:
  max_operations: 5000
server:
  listen_address: "127.0.0.1:9000"
"#,
        )
        .unwrap();

        let config = AppConfig::new(dir.path().to_str()).unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.state_key, "test_state");
        assert_eq!(config.engine.max_concurrent_executions, 4);
        assert_eq!(config.engine.admission_policy, AdmissionPolicy::FailFast);
        assert_eq!(config.engine.default_timeout, Duration::from_millis(1500));
        assert_eq!(config.rhai.max_operations, 5000);
        assert_eq!(config.server.listen_address, "127.0.0.1:9000");
        assert!(!config.sandbox.allowed_globals.is_empty());
    }

    #[test]
    fn test_app_config_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::new(dir.path().to_str()).unwrap();
        assert_eq!(config.state_key, default_state_key());
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.rhai, RhaiConfig::default());
    }
}
