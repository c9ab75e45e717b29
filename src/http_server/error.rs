//! Defines the custom `ApiError` type for the HTTP server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{
    engine::{EngineError, StateImportError},
    persistence::PersistenceError,
    templates::TemplateError,
};

/// A custom error type for the API that can be converted into an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// Represents a malformed request.
    BadRequest(String),

    /// Represents a resource that could not be found.
    NotFound(String),

    /// Represents a validation error for an unprocessable entity.
    UnprocessableEntity(String),

    /// Represents a request against a read-only resource.
    Forbidden(String),

    /// Represents an execution that could not be admitted.
    ServiceUnavailable(String),

    /// Represents a generic internal server error.
    InternalServerError(String),
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::InvalidInput(message) => ApiError::UnprocessableEntity(message),
            _ => ApiError::InternalServerError(err.to_string()),
        }
    }
}

impl From<TemplateError> for ApiError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound(_) => ApiError::NotFound(err.to_string()),
            TemplateError::ReadOnly(_) => ApiError::Forbidden(err.to_string()),
            TemplateError::Invalid(_) | TemplateError::Parameter(_) =>
                ApiError::UnprocessableEntity(err.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Capacity(_) | EngineError::Closed => ApiError::ServiceUnavailable(err.to_string()),
            EngineError::ContextNotFound(_) => ApiError::NotFound(err.to_string()),
            EngineError::EmptyRequest => ApiError::BadRequest(err.to_string()),
            EngineError::Template(inner) => inner.into(),
        }
    }
}

impl From<StateImportError> for ApiError {
    fn from(err: StateImportError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

/// Implements the conversion from `ApiError` into an `axum` response.
///
/// This is the central point for mapping internal application errors to
/// user-facing HTTP responses.
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::InternalServerError(err) => {
                tracing::error!("Internal server error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal server error occurred" }),
                )
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::UnprocessableEntity(message) =>
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message })),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, json!({ "error": message })),
            ApiError::ServiceUnavailable(message) =>
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": message })),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::ParameterValidationError;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_engine_errors_map_to_status_codes() {
        assert_eq!(status_of(EngineError::Capacity(2)), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(EngineError::ContextNotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(EngineError::EmptyRequest), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(EngineError::Template(TemplateError::NotFound("x".into()))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_template_errors_map_to_status_codes() {
        assert_eq!(status_of(TemplateError::ReadOnly("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(TemplateError::Parameter(ParameterValidationError::Missing { name: "count".into() })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_internal_errors_hide_details() {
        assert_eq!(
            status_of(PersistenceError::OperationFailed("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_of(StateImportError::DefaultContext), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
