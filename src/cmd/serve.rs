//! `serve`: the HTTP API with state restored at start and saved at shutdown.

use std::sync::Arc;

use super::{Error, load_engine};
use crate::{
    config::AppConfig,
    http_server::{self, ApiState},
    persistence::{StateRepository, persist_engine_state},
};

/// Serves until Ctrl-C, then persists the engine state.
pub async fn execute(config: &AppConfig) -> Result<(), Error> {
    let (engine, repo) = load_engine(config).await?;
    let state = ApiState::new(engine.clone())
        .with_repository(Arc::clone(&repo) as Arc<dyn StateRepository>, config.state_key.clone());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received.");
    };
    http_server::run_server_from_config(config, state, shutdown)
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    persist_engine_state(&engine, repo.as_ref(), &config.state_key).await?;
    tracing::info!(key = %config.state_key, "Engine state saved.");
    repo.close().await;
    Ok(())
}
