//! Engine state export and import.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use super::{ApiError, ApiState};
use crate::{models::EngineState, persistence::persist_engine_state};

/// Exports the engine state as a JSON document.
pub async fn export_state(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    Ok((StatusCode::OK, Json(state.engine.export_state())))
}

/// Imports a state document and, when a repository is configured, persists
/// the resulting state.
pub async fn import_state(
    State(state): State<ApiState>,
    Json(document): Json<EngineState>,
) -> Result<impl IntoResponse, ApiError> {
    state.engine.import_state(document)?;
    if let Some(repo) = &state.repo {
        persist_engine_state(&state.engine, repo.as_ref(), &state.state_key).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
