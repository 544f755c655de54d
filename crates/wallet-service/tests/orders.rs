//! Order placement, cancellation and delivery callback integration tests.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::TestHarness;
use serde_json::{json, Value};

async fn funded_harness(amount_minor: i64) -> TestHarness {
    let harness = TestHarness::new();
    let wallet_id = harness.open_wallet("starter").await;
    harness.fund(&wallet_id, amount_minor).await;
    harness
}

// ============================================================================
// Placement
// ============================================================================

#[tokio::test]
async fn placing_an_order_holds_funds() {
    let harness = funded_harness(10_000).await;

    let order = harness.place_order(4_000).await;

    assert_eq!(order["state"], "held");
    assert_eq!(order["cancellable"], true);
    assert_eq!(order["delivery_code"].as_str().unwrap().len(), 4);
    assert!(order["reservation_id"].is_string());
    assert_eq!(harness.available().await, 6_000);
}

#[tokio::test]
async fn placing_beyond_available_funds_is_payment_required() {
    let harness = funded_harness(10_000).await;
    harness.place_order(8_000).await;

    let response = harness
        .user_post("/v1/orders")
        .json(&json!({ "amount_minor": 3_000 }))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_funds");
    assert_eq!(body["error"]["details"]["available_minor"], 2_000);

    let listed: Value = harness.user_get("/v1/orders").await.json();
    assert_eq!(listed["orders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn retried_placement_returns_the_same_order() {
    let harness = funded_harness(10_000).await;
    let request = json!({ "amount_minor": 4_000, "idempotency_key": "checkout-1" });

    let first: Value = harness.user_post("/v1/orders").json(&request).await.json();
    let second: Value = harness.user_post("/v1/orders").json(&request).await.json();

    assert_eq!(first["id"], second["id"]);
    assert_eq!(harness.available().await, 6_000);
}

#[tokio::test]
async fn other_owners_cannot_see_an_order() {
    let harness = funded_harness(10_000).await;
    let order = harness.place_order(1_000).await;
    let order_id = order["id"].as_str().unwrap();

    let other = TestHarness::other_user_auth_header();
    common::with_header(
        harness.server.get(&format!("/v1/orders/{order_id}")),
        "authorization",
        &other,
    )
    .await
    .assert_status_not_found();

    let response = harness.user_get(&format!("/v1/orders/{order_id}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], order["id"]);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn owner_cancels_within_grace() {
    let harness = funded_harness(10_000).await;
    let order = harness.place_order(4_000).await;
    let order_id = order["id"].as_str().unwrap();

    harness.clock.advance(Duration::seconds(29));
    let response = harness
        .user_post(&format!("/v1/orders/{order_id}/cancel"))
        .json(&json!({ "reason": { "code": "changed_mind" } }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["state"], "cancelled");
    assert_eq!(body["metadata"]["cancelled_by"], "user");
    assert_eq!(harness.available().await, 10_000);
}

#[tokio::test]
async fn owner_cannot_cancel_after_grace() {
    let harness = funded_harness(10_000).await;
    let order = harness.place_order(4_000).await;
    let order_id = order["id"].as_str().unwrap();

    harness.clock.advance(Duration::seconds(30));
    let response = harness
        .user_post(&format!("/v1/orders/{order_id}/cancel"))
        .json(&json!({ "reason": { "code": "other", "note": "too slow" } }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_order_transition");
    assert_eq!(harness.available().await, 6_000);
}

// ============================================================================
// Delivery callbacks
// ============================================================================

#[tokio::test]
async fn confirmed_delivery_captures_the_hold() {
    let harness = funded_harness(10_000).await;
    let order = harness.place_order(4_000).await;
    let order_id = order["id"].as_str().unwrap();

    let assigned = harness
        .delivery(order_id, "assign", json!({ "partner_id": "rider-1" }))
        .await;
    assigned.assert_status_ok();
    let body: Value = assigned.json();
    assert_eq!(body["state"], "assigned");
    assert!(body.get("delivery_code").is_none());

    harness
        .delivery(order_id, "confirm", json!({ "delivery_code": "0000x" }))
        .await
        .assert_status_bad_request();

    let confirmed = harness
        .delivery(
            order_id,
            "confirm",
            json!({ "delivery_code": order["delivery_code"] }),
        )
        .await;
    confirmed.assert_status_ok();
    let body: Value = confirmed.json();
    assert_eq!(body["state"], "delivered");

    let wallet: Value = harness.user_get("/v1/wallet").await.json();
    assert_eq!(wallet["balance_minor"], 6_000);
    assert_eq!(wallet["held_minor"], 0);

    // A second confirmation changes nothing.
    let repeat = harness
        .delivery(
            order_id,
            "confirm",
            json!({ "delivery_code": order["delivery_code"] }),
        )
        .await;
    repeat.assert_status(StatusCode::CONFLICT);
    let body: Value = repeat.json();
    assert_eq!(body["error"]["code"], "already_resolved");
    assert_eq!(harness.available().await, 6_000);
}

#[tokio::test]
async fn failed_delivery_releases_the_hold() {
    let harness = funded_harness(10_000).await;
    let order = harness.place_order(4_000).await;
    let order_id = order["id"].as_str().unwrap();

    harness
        .delivery(order_id, "assign", json!({ "partner_id": "rider-2" }))
        .await
        .assert_status_ok();
    let response = harness
        .delivery(order_id, "fail", json!({ "reason": "address unreachable" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["state"], "failed");
    assert_eq!(harness.available().await, 10_000);
}

#[tokio::test]
async fn operator_cancels_assigned_order() {
    let harness = funded_harness(10_000).await;
    let order = harness.place_order(4_000).await;
    let order_id = order["id"].as_str().unwrap();
    harness
        .delivery(order_id, "assign", json!({ "partner_id": "rider-3" }))
        .await
        .assert_status_ok();

    harness.clock.advance(Duration::minutes(10));
    let response = harness
        .delivery(
            order_id,
            "cancel",
            json!({ "reason": { "code": "flagged_verification" } }),
        )
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["state"], "cancelled");
    assert_eq!(body["metadata"]["cancelled_by"], "operator");
    assert_eq!(harness.available().await, 10_000);
}

#[tokio::test]
async fn owner_cannot_cancel_assigned_order_without_cause() {
    let harness = funded_harness(10_000).await;
    let order = harness.place_order(4_000).await;
    let order_id = order["id"].as_str().unwrap();
    harness
        .delivery(order_id, "assign", json!({ "partner_id": "rider-6" }))
        .await
        .assert_status_ok();

    let response = harness
        .user_post(&format!("/v1/orders/{order_id}/cancel"))
        .json(&json!({ "reason": { "code": "changed_mind" } }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_order_transition");
    assert_eq!(harness.available().await, 6_000);
}

#[tokio::test]
async fn confirming_unassigned_order_conflicts() {
    let harness = funded_harness(10_000).await;
    let order = harness.place_order(4_000).await;
    let order_id = order["id"].as_str().unwrap();

    let response = harness
        .delivery(
            order_id,
            "confirm",
            json!({ "delivery_code": order["delivery_code"] }),
        )
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(harness.available().await, 6_000);
}

#[tokio::test]
async fn delivery_callbacks_need_the_service_key() {
    let harness = funded_harness(10_000).await;
    let order = harness.place_order(4_000).await;
    let order_id = order["id"].as_str().unwrap();

    harness
        .user_post(&format!("/v1/delivery/orders/{order_id}/assign"))
        .json(&json!({ "partner_id": "rider-4" }))
        .await
        .assert_status_unauthorized();

    common::with_header(
        harness
            .server
            .post(&format!("/v1/delivery/orders/{order_id}/assign")),
        "x-api-key",
        "wrong-key",
    )
    .json(&json!({ "partner_id": "rider-4" }))
    .await
    .assert_status_unauthorized();
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let harness = funded_harness(10_000).await;

    harness
        .delivery(
            "01HQZ6W7Y00000000000000000",
            "assign",
            json!({ "partner_id": "rider-5" }),
        )
        .await
        .assert_status_not_found();
}

// ============================================================================
// Sweeper
// ============================================================================

#[tokio::test]
async fn sweep_fails_orders_nobody_picked_up() {
    let harness = funded_harness(10_000).await;
    let order = harness.place_order(4_000).await;
    let order_id = order["id"].as_str().unwrap();

    harness.clock.advance(Duration::minutes(121));
    assert_eq!(wallet_service::sweeper::sweep_once(&harness.engine).await, 1);

    let body: Value = harness
        .user_get(&format!("/v1/orders/{order_id}"))
        .await
        .json();
    assert_eq!(body["state"], "failed");
    assert_eq!(harness.available().await, 10_000);
}
