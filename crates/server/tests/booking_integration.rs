//! Booking lifecycle over the HTTP surface.

mod common;

use common::{base_url, seed_published_event, start_test_server};
use reqwest::Client;
use serde_json::{json, Value};

async fn tier_sold(client: &Client, base: &str, tier_id: &str) -> u64 {
    let tier: Value = client
        .get(format!("{}/tiers/{}", base, tier_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    tier["sold"].as_u64().unwrap()
}

#[tokio::test]
async fn test_create_booking_reserves_seats() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (_event_id, tier_id) = seed_published_event(&client, &base, 10).await;

    let response = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 3 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let booking: Value = response.json().await.unwrap();
    assert!(booking["id"].is_string());
    assert_eq!(booking["status"], "PENDING");
    assert_eq!(booking["quantity"], 3);
    assert!(booking["expires_at"].is_string());

    assert_eq!(tier_sold(&client, &base, &tier_id).await, 3);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_oversell_is_rejected() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (_event_id, tier_id) = seed_published_event(&client, &base, 5).await;

    let first = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 409);

    let body: Value = second.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("available"));

    assert_eq!(tier_sold(&client, &base, &tier_id).await, 4);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_invalid_quantity_rejected() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (_event_id, tier_id) = seed_published_event(&client, &base, 10).await;

    let response = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 11 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    assert_eq!(tier_sold(&client, &base, &tier_id).await, 0);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_booking_on_draft_event_rejected() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (_event_id, tier_id) = common::seed_draft_event(&client, &base, 10).await;

    let response = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_confirm_booking() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (_event_id, tier_id) = seed_published_event(&client, &base, 10).await;

    let booking: Value = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let booking_id = booking["id"].as_str().unwrap();

    let response = client
        .post(format!("{}/bookings/{}/confirm", base, booking_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let confirmed: Value = response.json().await.unwrap();
    assert_eq!(confirmed["status"], "CONFIRMED");
    assert!(confirmed["expires_at"].is_null());

    // Confirming again conflicts.
    let again = client
        .post(format!("{}/bookings/{}/confirm", base, booking_id))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 409);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_cancel_booking_releases_seats() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (_event_id, tier_id) = seed_published_event(&client, &base, 10).await;

    let booking: Value = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 4 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let booking_id = booking["id"].as_str().unwrap();
    assert_eq!(tier_sold(&client, &base, &tier_id).await, 4);

    let response = client
        .post(format!("{}/bookings/{}/cancel", base, booking_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(tier_sold(&client, &base, &tier_id).await, 0);

    // Cancelled is terminal.
    let again = client
        .post(format!("{}/bookings/{}/cancel", base, booking_id))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 409);
    assert_eq!(tier_sold(&client, &base, &tier_id).await, 0);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_refund_requires_managing_role() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (_event_id, tier_id) = seed_published_event(&client, &base, 10).await;

    let booking: Value = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let booking_id = booking["id"].as_str().unwrap();

    // Anonymous carries no staff/support role.
    let response = client
        .post(format!("{}/bookings/{}/refund", base, booking_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_list_bookings() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (_event_id, tier_id) = seed_published_event(&client, &base, 50).await;

    for quantity in [1, 2, 3] {
        let response = client
            .post(format!("{}/bookings", base))
            .json(&json!({ "tier_id": tier_id, "quantity": quantity }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }

    let listing: Value = client
        .get(format!("{}/bookings", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(listing["total"], 3);
    assert_eq!(listing["bookings"].as_array().unwrap().len(), 3);

    let filtered: Value = client
        .get(format!("{}/bookings?status=PENDING&limit=2", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(filtered["bookings"].as_array().unwrap().len(), 2);
    assert_eq!(filtered["total"], 3);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_audit_trail_records_booking_lifecycle() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (_event_id, tier_id) = seed_published_event(&client, &base, 10).await;

    let booking: Value = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let booking_id = booking["id"].as_str().unwrap();

    client
        .post(format!("{}/bookings/{}/confirm", base, booking_id))
        .send()
        .await
        .unwrap();

    // The audit writer is async; give it a moment to drain.
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let audit: Value = client
        .get(format!("{}/audit?booking_id={}", base, booking_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let types: Vec<&str> = audit["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["event_type"].as_str().unwrap())
        .collect();
    assert!(types.contains(&"booking_created"));
    assert!(types.contains(&"booking_confirmed"));

    server.kill().await.ok();
}
