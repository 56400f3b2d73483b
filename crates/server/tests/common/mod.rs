//! Shared helpers for server integration tests: spawn the real binary
//! against a temp database and drive it over HTTP.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};
use tokio::time::sleep;

/// Find an available port
pub fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a config with database path
pub fn config_with_db(port: u16, db_path: &str) -> String {
    format!(
        r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = {}

[database]
path = "{}"
"#,
        port, db_path
    )
}

/// Spawn the server and return a handle
pub async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_boxoffice"))
        .env("BOXOFFICE_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Helper to start a server for testing
pub async fn start_test_server() -> (u16, tokio::process::Child, TempDir) {
    let port = get_available_port();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let config_content = config_with_db(port, db_path.to_str().unwrap());

    // The config file only needs to outlive startup; the server reads it
    // once before the health endpoint comes up.
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let server = spawn_server(temp_file.path()).await;

    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    // Give a moment for initialization
    sleep(Duration::from_millis(100)).await;

    (port, server, temp_dir)
}

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api/v1", port)
}

/// Seed organization, venue, category and a draft event with one
/// STANDARD tier via the API. Returns (event_id, tier_id).
pub async fn seed_draft_event(client: &Client, base: &str, quota: u32) -> (String, String) {
    let org: Value = client
        .post(format!("{}/organizations", base))
        .json(&json!({ "name": "Acme Events" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let venue: Value = client
        .post(format!("{}/venues", base))
        .json(&json!({ "name": "Grand Hall", "capacity": 1000 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let category: Value = client
        .post(format!("{}/categories", base))
        .json(&json!({ "name": "Concert" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let starts_at = chrono::Utc::now() + chrono::Duration::days(30);
    let ends_at = starts_at + chrono::Duration::hours(3);
    let event: Value = client
        .post(format!("{}/events", base))
        .json(&json!({
            "organization_id": org["id"],
            "venue_id": venue["id"],
            "category_id": category["id"],
            "title": "Spring Gala",
            "description": "Annual fundraiser",
            "starts_at": starts_at.to_rfc3339(),
            "ends_at": ends_at.to_rfc3339(),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let event_id = event["id"].as_str().unwrap().to_string();

    let tier: Value = client
        .post(format!("{}/events/{}/tiers", base, event_id))
        .json(&json!({
            "ticket_type": "STANDARD",
            "price": "100.00",
            "quota": quota,
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    (event_id, tier["id"].as_str().unwrap().to_string())
}

/// Seed and publish an event with one tier. Returns (event_id, tier_id).
pub async fn seed_published_event(client: &Client, base: &str, quota: u32) -> (String, String) {
    let (event_id, tier_id) = seed_draft_event(client, base, quota).await;

    let response = client
        .post(format!("{}/events/{}/publish", base, event_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    (event_id, tier_id)
}
