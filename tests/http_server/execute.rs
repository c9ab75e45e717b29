use serde_json::json;

use crate::helpers::*;

#[tokio::test]
async fn execute_returns_camel_case_result() {
    let server = TestServer::new();

    let (status, body) = server.post("/execute", json!({ "code": "return 1 + 1;" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], 2);
    assert!(body["executionTime"].is_number());
    assert_eq!(body["contextSnapshot"]["id"], "default");
}

#[tokio::test]
async fn execute_reports_script_failures_in_body() {
    let server = TestServer::new();

    let (status, body) = server.post("/execute", json!({ "code": "eval('1')" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "SecurityViolation");
}

#[tokio::test]
async fn execute_with_template_and_inline_context() {
    let server = TestServer::new();

    let (status, body) = server
        .post(
            "/execute",
            json!({ "templateId": "random-data-generator", "parameters": { "count": 2 } }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) =
        server.post("/execute", json!({ "code": "threshold * 2", "context": { "threshold": 21 } })).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], 42);
}

#[tokio::test]
async fn execute_rejects_bad_requests() {
    let server = TestServer::new();

    let (status, body) = server.post("/execute", json!({})).await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("code"));

    let (status, _) = server.post("/execute", json!({ "code": "1", "contextId": "missing" })).await;
    assert_eq!(status, 404);

    let (status, _) = server.post("/execute", json!({ "templateId": "missing" })).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn batch_returns_results_in_order() {
    let server = TestServer::new();

    let (status, body) = server
        .post(
            "/execute/batch",
            json!([
                { "code": "timers.sleep(30); \"first\"" },
                { "code": "throw \"second\";" },
                { "templateId": "data-filter", "parameters": {} },
                { "code": "\"fourth\"" }
            ]),
        )
        .await;

    assert_eq!(status, 200);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0]["data"], "first");
    assert_eq!(results[1]["error"]["kind"], "RuntimeError");
    assert_eq!(results[2]["error"]["kind"], "ParameterValidationError");
    assert_eq!(results[3]["data"], "fourth");

    let (status, _) = server.post("/execute/batch", json!([])).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn security_check_lists_issues() {
    let server = TestServer::new();

    let (status, body) = server.post("/security/check", json!({ "code": "let x = 1; x" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["safe"], true);
    assert_eq!(body["issues"], json!([]));

    let (status, body) = server.post("/security/check", json!({ "code": "process.exit()" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["safe"], false);
    assert!(!body["issues"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn stats_can_be_read_and_cleared() {
    let server = TestServer::new();
    server.post("/execute", json!({ "code": "1" })).await;
    server.post("/execute", json!({ "code": "throw 1;" })).await;

    let (status, body) = server.get("/stats").await;
    assert_eq!(status, 200);
    assert_eq!(body["totalExecutions"], 2);
    assert_eq!(body["successfulExecutions"], 1);
    assert_eq!(body["failedExecutions"], 1);

    let (status, _) = server.delete("/stats").await;
    assert_eq!(status, 204);

    let (_, body) = server.get("/stats").await;
    assert_eq!(body["totalExecutions"], 0);
}
