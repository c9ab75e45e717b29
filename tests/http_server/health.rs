use crate::helpers::*;

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let server = TestServer::new();

    let (status, body) = server.get("/health").await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let server = TestServer::new();

    let (status, _) = server.get("/monitors").await;

    assert_eq!(status, 404);
}
