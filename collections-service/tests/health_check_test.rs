//! Health, readiness and metrics on a running server.

mod common;

use collections_service::startup::Application;
use common::test_config;
use reqwest::Client;

async fn spawn_server() -> String {
    let app = Application::build(test_config())
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", app.port());
    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });
    address
}

#[tokio::test]
async fn health_check_works() {
    let address = spawn_server().await;

    let response = Client::new()
        .get(format!("{}/health", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "collections-service");
}

#[tokio::test]
async fn readiness_check_works() {
    let address = spawn_server().await;

    let response = Client::new()
        .get(format!("{}/ready", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn metrics_endpoint_works() {
    let address = spawn_server().await;
    let client = Client::new();
    client.get(format!("{}/health", address)).send().await.unwrap();

    let response = client
        .get(format!("{}/metrics", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap_or("").contains("text/plain"))
        .unwrap_or(false));
    let text = response.text().await.unwrap();
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let address = spawn_server().await;

    let response = Client::new()
        .get(format!("{}/health", address))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-123");
}
