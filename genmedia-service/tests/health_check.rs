mod common;

use common::TestApp;
use genmedia_service::services::providers::mock::MockScript;

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::spawn(MockScript::default()).await;

    let response = app.get("/health").await;

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "genmedia-service");
}

#[tokio::test]
async fn caller_request_id_is_kept() {
    let app = TestApp::spawn(MockScript::default()).await;

    let response = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "req-1234")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.headers()["x-request-id"], "req-1234");
}

#[tokio::test]
async fn readiness_check_returns_ok() {
    let app = TestApp::spawn(MockScript::default()).await;

    let response = app.get("/ready").await;

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn metrics_are_exported() {
    let app = TestApp::spawn(MockScript::default()).await;
    app.post_json("/api/video-generation", serde_json::json!({"prompt": "a paper boat"}))
        .await;

    let response = app.get("/metrics").await;

    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("genmedia_generations_total"));
}
