//! Server startup, health, config and metrics endpoints.

mod common;

use common::{base_url, start_test_server};
use reqwest::Client;
use serde_json::Value;

#[tokio::test]
async fn test_health_endpoint() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/health", base_url(port)))
        .send()
        .await
        .expect("Failed to reach health endpoint");
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_config_endpoint_redacts_secrets() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/config", base_url(port)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["auth"]["method"], "none");
    assert_eq!(body["auth"]["api_key_configured"], false);
    assert!(body["auth"].get("api_key").is_none());
    assert_eq!(body["booking"]["max_quantity"], 10);
    assert_eq!(body["reaper"]["enabled"], true);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let client = Client::new();

    // Generate at least one request before scraping.
    client
        .get(format!("{}/health", base_url(port)))
        .send()
        .await
        .unwrap();

    let response = client
        .get(format!("http://127.0.0.1:{}/metrics", port))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("boxoffice_http_requests_total"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_reaper_status_endpoint() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/reaper/status", base_url(port)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["running"], true);
    assert_eq!(body["pending_count"], 0);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/nonsense", base_url(port)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    server.kill().await.ok();
}
