use std::sync::Arc;

use script_engine::persistence::StateRepository;
use serde_json::json;

use crate::helpers::*;

#[tokio::test]
async fn state_round_trips_between_servers() {
    let source = TestServer::new();
    source.post("/execute", json!({ "code": "1" })).await;
    source.post("/contexts", json!({ "name": "exported", "variables": { "k": "v" } })).await;

    let (status, state) = source.get("/state").await;
    assert_eq!(status, 200);
    assert_eq!(state["stats"]["totalExecutions"], 1);

    let target = TestServer::new();
    let (status, _) = target.post("/state", state.clone()).await;
    assert_eq!(status, 204);

    let (_, imported) = target.get("/state").await;
    assert_eq!(imported["contexts"], state["contexts"]);
    assert_eq!(imported["stats"]["totalExecutions"], 1);
}

#[tokio::test]
async fn invalid_state_is_rejected() {
    let server = TestServer::new();
    let (_, mut state) = server.get("/state").await;
    state["version"] = json!(999);

    let (status, body) = server.post("/state", state).await;

    assert_eq!(status, 422);
    assert!(body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn imported_state_is_persisted() {
    let repo = create_test_repo().await;
    let server = TestServer::with_repository(repo.clone() as Arc<dyn StateRepository>);
    server.engine.contexts().create_context("kept", None);
    let (_, state) = server.get("/state").await;

    let (status, _) = server.post("/state", state).await;
    assert_eq!(status, 204);

    let saved = repo.load_state("engine_state").await.unwrap().expect("state should be saved");
    assert!(saved.contexts.iter().any(|c| c.name == "kept"));
}
