//! Command line subcommands.

pub mod run;
pub mod serve;
pub mod templates;

use std::{path::Path, sync::Arc};

use thiserror::Error;

use crate::{
    config::AppConfig,
    engine::{EngineError, ScriptEngine},
    models::ErrorKind,
    persistence::{PersistenceError, SqliteStateRepository, restore_engine_state},
    templates::TemplateError,
};

/// Errors reported by the subcommands.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading a script file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    /// Parameters or output could not be (de)serialized.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// The state store failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    /// The engine rejected the request.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// Template lookup or code generation failed.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    /// The script ran and failed.
    #[error("Script failed with {0}")]
    ScriptFailed(ErrorKind),
    /// The script did not pass the static checks.
    #[error("Script rejected: {0}")]
    ScriptRejected(String),
    /// The HTTP server stopped with an error.
    #[error("Server error: {0}")]
    Server(String),
}

/// Opens the state store named by `config.database_url`, creating the
/// database directory when needed, and runs migrations.
pub async fn open_repository(config: &AppConfig) -> Result<Arc<SqliteStateRepository>, Error> {
    if let Some(path) = config.database_url.strip_prefix("sqlite:") {
        let path = Path::new(path.trim_start_matches("//"));
        if !config.database_url.contains(":memory:") {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    let repo = Arc::new(SqliteStateRepository::new(&config.database_url).await?);
    repo.run_migrations().await?;
    Ok(repo)
}

/// Builds an engine from `config` and loads the persisted state into it.
pub async fn load_engine(config: &AppConfig) -> Result<(ScriptEngine, Arc<SqliteStateRepository>), Error> {
    let engine = ScriptEngine::from_app_config(config);
    let repo = open_repository(config).await?;
    if restore_engine_state(&engine, repo.as_ref(), &config.state_key).await? {
        tracing::info!(key = %config.state_key, "Engine state restored.");
    }
    Ok((engine, repo))
}
