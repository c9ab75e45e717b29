//! Context store handlers.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ApiError, ApiState};
use crate::{contexts::DEFAULT_CONTEXT_ID, models::ScriptFunction};

/// Body of `POST /contexts`.
#[derive(Debug, Deserialize)]
pub struct CreateContextRequest {
    name: String,
    #[serde(default)]
    variables: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    functions: BTreeMap<String, ScriptFunction>,
}

/// Lists every stored context.
pub async fn list_contexts(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let contexts = state.engine.contexts().list_contexts();
    Ok((StatusCode::OK, Json(json!({ "contexts": contexts }))))
}

/// Returns a single context by id.
pub async fn get_context(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let context = state
        .engine
        .contexts()
        .get_context(&id)
        .ok_or_else(|| ApiError::NotFound("Context not found".to_string()))?;
    Ok((StatusCode::OK, Json(json!({ "context": context }))))
}

/// Creates a context and attaches the supplied functions.
pub async fn create_context(
    State(state): State<ApiState>,
    Json(request): Json<CreateContextRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::UnprocessableEntity("Context name must not be empty".to_string()));
    }
    let contexts = state.engine.contexts();
    let created = contexts.create_context(request.name, request.variables);
    for (name, function) in request.functions {
        contexts.add_function(&created.id, name, function);
    }
    let context = contexts.get_context(&created.id).unwrap_or(created);
    Ok((StatusCode::CREATED, Json(json!({ "context": context }))))
}

/// Deletes a context. The default context is read-only.
pub async fn delete_context(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if id == DEFAULT_CONTEXT_ID {
        return Err(ApiError::Forbidden("The default context cannot be deleted".to_string()));
    }
    if !state.engine.contexts().delete_context(&id) {
        return Err(ApiError::NotFound("Context not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
