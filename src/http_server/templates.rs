//! Template catalogue handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ApiError, ApiState};
use crate::models::{NewTemplate, TemplateCategory, TemplateUpdate};

/// Query string of `GET /templates`.
#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    category: Option<String>,
}

/// Lists all templates, optionally filtered by `?category=`.
pub async fn list_templates(
    State(state): State<ApiState>,
    Query(query): Query<TemplateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let templates = match query.category {
        Some(category) => {
            let category: TemplateCategory = category.parse().map_err(ApiError::BadRequest)?;
            state.engine.templates().get_templates_by_category(category)
        }
        None => state.engine.templates().get_all_templates(),
    };
    Ok((StatusCode::OK, Json(json!({ "templates": templates }))))
}

/// Returns a single template by id.
pub async fn get_template(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state
        .engine
        .templates()
        .get_template(&id)
        .ok_or_else(|| ApiError::NotFound("Template not found".to_string()))?;
    Ok((StatusCode::OK, Json(json!({ "template": template }))))
}

/// Creates a user template.
pub async fn create_template(
    State(state): State<ApiState>,
    Json(new): Json<NewTemplate>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state.engine.templates().create_template(new)?;
    Ok((StatusCode::CREATED, Json(json!({ "template": template }))))
}

/// Updates a user template. System templates are read-only.
pub async fn update_template(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(update): Json<TemplateUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let templates = state.engine.templates();
    if templates.is_system_template(&id) {
        return Err(ApiError::Forbidden("System templates are read-only".to_string()));
    }
    if !templates.update_template(&id, update)? {
        return Err(ApiError::NotFound("Template not found".to_string()));
    }
    let template = templates.get_template(&id).ok_or_else(|| ApiError::NotFound("Template not found".to_string()))?;
    Ok((StatusCode::OK, Json(json!({ "template": template }))))
}

/// Deletes a user template.
pub async fn delete_template(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let templates = state.engine.templates();
    if templates.is_system_template(&id) {
        return Err(ApiError::Forbidden("System templates are read-only".to_string()));
    }
    if !templates.delete_template(&id) {
        return Err(ApiError::NotFound("Template not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Validates the parameters and returns the generated code without
/// running it.
pub async fn generate_code(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(parameters): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let code = state.engine.templates().generate_code(&id, &parameters)?;
    Ok((StatusCode::OK, Json(json!({ "code": code }))))
}
