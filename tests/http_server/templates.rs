use serde_json::json;

use crate::helpers::*;

fn doubler() -> serde_json::Value {
    json!({
        "name": "Doubler",
        "category": "utility",
        "description": "Doubles a number",
        "code": "{{n}} * 2",
        "parameters": [{ "name": "n", "type": "number", "required": true }]
    })
}

#[tokio::test]
async fn templates_are_listed_and_filtered() {
    let server = TestServer::new();

    let (status, body) = server.get("/templates").await;
    assert_eq!(status, 200);
    assert_eq!(body["templates"].as_array().unwrap().len(), 7);

    let (status, body) = server.get("/templates?category=data-processing").await;
    assert_eq!(status, 200);
    let templates = body["templates"].as_array().unwrap();
    assert!(!templates.is_empty());
    assert!(templates.iter().all(|t| t["category"] == "data-processing"));

    let (status, _) = server.get("/templates?category=bogus").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn template_by_id() {
    let server = TestServer::new();

    let (status, body) = server.get("/templates/data-filter").await;
    assert_eq!(status, 200);
    assert_eq!(body["template"]["id"], "data-filter");
    assert_eq!(body["template"]["isSystem"], true);

    let (status, body) = server.get("/templates/missing").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Template not found");
}

#[tokio::test]
async fn user_template_lifecycle() {
    let server = TestServer::new();

    let (status, body) = server.post("/templates", doubler()).await;
    assert_eq!(status, 201);
    let id = body["template"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["template"]["isSystem"], false);

    let (status, body) = server.post(&format!("/templates/{id}/generate"), json!({ "n": 21 })).await;
    assert_eq!(status, 200);
    assert_eq!(body["code"], "21 * 2");

    let (status, body) = server.put(&format!("/templates/{id}"), json!({ "name": "Twice" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["template"]["name"], "Twice");
    assert_eq!(body["template"]["id"], id.as_str());

    let (status, _) = server.put(&format!("/templates/{id}"), json!({ "code": "{{m}} * 2" })).await;
    assert_eq!(status, 422);

    let (status, _) = server.delete(&format!("/templates/{id}")).await;
    assert_eq!(status, 204);
    let (status, _) = server.delete(&format!("/templates/{id}")).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn invalid_templates_are_rejected() {
    let server = TestServer::new();

    let mut template = doubler();
    template["code"] = json!("{{n}} + {{unknown}}");
    let (status, body) = server.post("/templates", template).await;
    assert_eq!(status, 422);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn system_templates_are_read_only() {
    let server = TestServer::new();

    let (status, _) = server.put("/templates/data-filter", json!({ "name": "Mine" })).await;
    assert_eq!(status, 403);

    let (status, _) = server.delete("/templates/data-filter").await;
    assert_eq!(status, 403);

    let (_, body) = server.get("/templates/data-filter").await;
    assert_eq!(body["template"]["name"], "Data Filter");
}

#[tokio::test]
async fn generate_validates_parameters() {
    let server = TestServer::new();

    let (status, body) = server.post("/templates/data-filter/generate", json!({ "field": "v" })).await;
    assert_eq!(status, 422);
    assert!(body["error"].as_str().unwrap().contains("data"));

    let (status, _) = server.post("/templates/missing/generate", json!({})).await;
    assert_eq!(status, 404);
}
