//! Execution, screening and statistics handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use super::{ApiError, ApiState};
use crate::models::ExecutionRequest;

/// Body of `POST /security/check`.
#[derive(Debug, Deserialize)]
pub struct SecurityCheckRequest {
    code: String,
}

/// Runs one request. Script failures come back as a 200 with
/// `success: false`.
pub async fn execute(
    State(state): State<ApiState>,
    Json(request): Json<ExecutionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.engine.execute_request(request).await?;
    Ok((StatusCode::OK, Json(result)))
}

/// Runs independent requests; results keep the input order.
pub async fn execute_batch(
    State(state): State<ApiState>,
    Json(requests): Json<Vec<ExecutionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    if requests.is_empty() {
        return Err(ApiError::BadRequest("Batch must contain at least one request".to_string()));
    }
    let results = state.engine.execute_batch(requests).await;
    Ok((StatusCode::OK, Json(json!({ "results": results }))))
}

/// Screens code without running it.
pub async fn check_security(
    State(state): State<ApiState>,
    Json(request): Json<SecurityCheckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.engine.check_script_security(&request.code);
    Ok((StatusCode::OK, Json(report)))
}

/// Returns the execution statistics.
pub async fn get_stats(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    Ok((StatusCode::OK, Json(state.engine.get_execution_stats())))
}

/// Resets the execution statistics.
pub async fn clear_stats(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    state.engine.clear_stats();
    Ok(StatusCode::NO_CONTENT)
}
