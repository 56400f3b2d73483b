//! Event publication gate and tier management over the HTTP surface.

mod common;

use common::{base_url, seed_draft_event, seed_published_event, start_test_server};
use reqwest::Client;
use serde_json::{json, Value};

#[tokio::test]
async fn test_publish_requires_a_tier() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    // Seed everything except the tier by hand.
    let org: Value = client
        .post(format!("{}/organizations", base))
        .json(&json!({ "name": "Gate Org" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let venue: Value = client
        .post(format!("{}/venues", base))
        .json(&json!({ "name": "Gate Venue", "capacity": 100 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let category: Value = client
        .post(format!("{}/categories", base))
        .json(&json!({ "name": "Gate Cat" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let starts_at = chrono::Utc::now() + chrono::Duration::days(7);
    let event: Value = client
        .post(format!("{}/events", base))
        .json(&json!({
            "organization_id": org["id"],
            "venue_id": venue["id"],
            "category_id": category["id"],
            "title": "Gated Event",
            "starts_at": starts_at.to_rfc3339(),
            "ends_at": (starts_at + chrono::Duration::hours(2)).to_rfc3339(),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let event_id = event["id"].as_str().unwrap();
    assert_eq!(event["status"], "DRAFT");

    let no_tiers = client
        .post(format!("{}/events/{}/publish", base, event_id))
        .send()
        .await
        .unwrap();
    assert_eq!(no_tiers.status(), 409);

    client
        .post(format!("{}/events/{}/tiers", base, event_id))
        .json(&json!({ "ticket_type": "VIP", "price": "250.00", "quota": 10 }))
        .send()
        .await
        .unwrap();

    let published = client
        .post(format!("{}/events/{}/publish", base, event_id))
        .send()
        .await
        .unwrap();
    assert_eq!(published.status(), 200);
    let body: Value = published.json().await.unwrap();
    assert_eq!(body["status"], "PUBLISHED");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_bad_schedule_rejected() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let org: Value = client
        .post(format!("{}/organizations", base))
        .json(&json!({ "name": "Acme" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let venue: Value = client
        .post(format!("{}/venues", base))
        .json(&json!({ "name": "Hall" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let category: Value = client
        .post(format!("{}/categories", base))
        .json(&json!({ "name": "Cat" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let starts_at = chrono::Utc::now() + chrono::Duration::days(7);
    let response = client
        .post(format!("{}/events", base))
        .json(&json!({
            "organization_id": org["id"],
            "venue_id": venue["id"],
            "category_id": category["id"],
            "title": "Backwards Event",
            "starts_at": starts_at.to_rfc3339(),
            "ends_at": (starts_at - chrono::Duration::hours(2)).to_rfc3339(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_cancel_event_cascades_to_bookings() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (event_id, tier_id) = seed_published_event(&client, &base, 20).await;

    let booking: Value = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let booking_id = booking["id"].as_str().unwrap();

    let response = client
        .post(format!("{}/events/{}/cancel", base, event_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let outcome: Value = response.json().await.unwrap();
    assert_eq!(outcome["event"]["status"], "CANCELLED");
    assert_eq!(outcome["cancelled_bookings"], 1);
    assert_eq!(outcome["released_seats"], 5);

    let cancelled_booking: Value = client
        .get(format!("{}/bookings/{}", base, booking_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cancelled_booking["status"], "CANCELLED");

    let tier: Value = client
        .get(format!("{}/tiers/{}", base, tier_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tier["sold"], 0);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_available_tiers_hides_sold_out() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (event_id, tier_id) = seed_published_event(&client, &base, 2).await;

    let available: Value = client
        .get(format!("{}/events/{}/tiers/available", base, event_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(available.as_array().unwrap().len(), 1);

    // Sell it out.
    let response = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let available: Value = client
        .get(format!("{}/events/{}/tiers/available", base, event_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(available.as_array().unwrap().is_empty());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_adjust_quota_floor_is_sold() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (_event_id, tier_id) = seed_published_event(&client, &base, 10).await;

    let response = client
        .post(format!("{}/bookings", base))
        .json(&json!({ "tier_id": tier_id, "quantity": 6 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let too_low = client
        .patch(format!("{}/tiers/{}/quota", base, tier_id))
        .json(&json!({ "quota": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(too_low.status(), 409);

    let ok = client
        .patch(format!("{}/tiers/{}/quota", base, tier_id))
        .json(&json!({ "quota": 6 }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);
    let tier: Value = ok.json().await.unwrap();
    assert_eq!(tier["quota"], 6);
    assert_eq!(tier["available"], 0);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_duplicate_tier_type_rejected() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (event_id, _tier_id) = seed_draft_event(&client, &base, 10).await;

    let duplicate = client
        .post(format!("{}/events/{}/tiers", base, event_id))
        .json(&json!({ "ticket_type": "STANDARD", "price": "80.00", "quota": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_stale_event_update_conflicts() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (event_id, _tier_id) = seed_draft_event(&client, &base, 10).await;

    let first = client
        .patch(format!("{}/events/{}", base, event_id))
        .json(&json!({ "description": "Updated", "expected_version": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    // Same version again: the row has moved on.
    let stale = client
        .patch(format!("{}/events/{}", base, event_id))
        .json(&json!({ "description": "Too late", "expected_version": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status(), 409);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_organization_protected_while_events_exist() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let (event_id, _tier_id) = seed_draft_event(&client, &base, 10).await;

    let event: Value = client
        .get(format!("{}/events/{}", base, event_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let org_id = event["organization_id"].as_str().unwrap();

    let response = client
        .delete(format!("{}/organizations/{}", base, org_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    server.kill().await.ok();
}

#[tokio::test]
async fn test_duplicate_organization_name_rejected() {
    let (port, mut server, _temp_dir) = start_test_server().await;
    let base = base_url(port);
    let client = Client::new();

    let first = client
        .post(format!("{}/organizations", base))
        .json(&json!({ "name": "Acme Events" }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let duplicate = client
        .post(format!("{}/organizations", base))
        .json(&json!({ "name": "Acme Events" }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);

    server.kill().await.ok();
}
