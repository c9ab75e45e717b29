//! HTTP server module

mod contexts;
mod error;
mod execute;
mod state;
mod templates;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};
pub use error::ApiError;
use serde_json::json;

use crate::{config::AppConfig, engine::ScriptEngine, persistence::StateRepository};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    /// The engine serving requests.
    pub engine: ScriptEngine,
    /// Where `POST /state` persists imported documents, if anywhere.
    pub repo: Option<Arc<dyn StateRepository>>,
    /// Key of the persisted state document.
    pub state_key: String,
}

impl ApiState {
    /// State without a backing repository.
    pub fn new(engine: ScriptEngine) -> Self {
        Self { engine, repo: None, state_key: "engine_state".to_string() }
    }

    /// Persists imported state documents to `repo` under `state_key`.
    pub fn with_repository(mut self, repo: Arc<dyn StateRepository>, state_key: impl Into<String>) -> Self {
        self.repo = Some(repo);
        self.state_key = state_key.into();
        self
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Builds the API router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/execute", post(execute::execute))
        .route("/execute/batch", post(execute::execute_batch))
        .route("/security/check", post(execute::check_security))
        .route("/stats", get(execute::get_stats).delete(execute::clear_stats))
        .route("/templates", get(templates::list_templates).post(templates::create_template))
        .route(
            "/templates/{id}",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/templates/{id}/generate", post(templates::generate_code))
        .route("/contexts", get(contexts::list_contexts).post(contexts::create_context))
        .route("/contexts/{id}", get(contexts::get_context).delete(contexts::delete_context))
        .route("/state", get(state::export_state).post(state::import_state))
        .with_state(state)
}

/// Runs the HTTP server until `shutdown` resolves.
pub async fn run_server_from_config(
    config: &AppConfig,
    state: ApiState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = config.server.listen_address.parse()?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "HTTP server listening");

    axum::serve(listener, app.into_make_service()).with_graceful_shutdown(shutdown).await?;
    Ok(())
}
