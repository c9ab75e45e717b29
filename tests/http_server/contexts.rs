use serde_json::json;

use crate::helpers::*;

#[tokio::test]
async fn seed_contexts_are_listed() {
    let server = TestServer::new();

    let (status, body) = server.get("/contexts").await;

    assert_eq!(status, 200);
    let ids: Vec<_> = body["contexts"].as_array().unwrap().iter().map(|c| c["id"].clone()).collect();
    assert!(ids.contains(&json!("default")));
    assert!(ids.contains(&json!("data-validation")));
    assert!(ids.contains(&json!("device-message")));
}

#[tokio::test]
async fn context_lifecycle() {
    let server = TestServer::new();

    let (status, body) = server
        .post(
            "/contexts",
            json!({
                "name": "widgets",
                "variables": { "base": 10 },
                "functions": { "addBase": { "params": ["x", "base"], "body": "x + base" } }
            }),
        )
        .await;
    assert_eq!(status, 201);
    let id = body["context"]["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("ctx_"));

    let (status, body) = server.get(&format!("/contexts/{id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["context"]["name"], "widgets");
    assert_eq!(body["context"]["variables"]["base"], 10);

    let (status, body) =
        server.post("/execute", json!({ "code": "addBase(5, base)", "contextId": id.as_str() })).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], 15);

    let (status, _) = server.delete(&format!("/contexts/{id}")).await;
    assert_eq!(status, 204);
    let (status, _) = server.get(&format!("/contexts/{id}")).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn default_context_cannot_be_deleted() {
    let server = TestServer::new();

    let (status, _) = server.delete("/contexts/default").await;
    assert_eq!(status, 403);

    let (status, _) = server.get("/contexts/default").await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn context_name_is_required() {
    let server = TestServer::new();

    let (status, _) = server.post("/contexts", json!({ "name": "  " })).await;
    assert_eq!(status, 422);
}
