use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use script_engine::{
    engine::ScriptEngine,
    http_server::{self, ApiState},
    persistence::{SqliteStateRepository, StateRepository},
};
use serde_json::Value;
use tower::ServiceExt;

pub async fn create_test_repo() -> Arc<SqliteStateRepository> {
    let repo = SqliteStateRepository::new("sqlite::memory:")
        .await
        .expect("Failed to create in-memory repo");
    repo.run_migrations().await.expect("Failed to run migrations");
    Arc::new(repo)
}

pub struct TestServer {
    pub engine: ScriptEngine,
    app: Router,
}

impl TestServer {
    pub fn new() -> Self {
        let engine = ScriptEngine::default();
        let app = http_server::router(ApiState::new(engine.clone()));
        Self { engine, app }
    }

    pub fn with_repository(repo: Arc<dyn StateRepository>) -> Self {
        let engine = ScriptEngine::default();
        let app = http_server::router(ApiState::new(engine.clone()).with_repository(repo, "engine_state"));
        Self { engine, app }
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("Failed to encode body"))),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self.app.clone().oneshot(request).await.expect("Request failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Failed to parse JSON")
        };
        (status, body)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, None).await
    }
}
