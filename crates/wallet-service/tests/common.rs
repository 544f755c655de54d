//! Common test utilities for wallet service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::Router;
use axum_test::{TestRequest, TestResponse, TestServer};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use wallet_core::OwnerId;
use wallet_engine::{Engine, ManualClock};
use wallet_service::{create_router, AppState, ServiceConfig};
use wallet_store::MemoryStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The clock the engine reads; tests move it forward explicitly.
    pub clock: Arc<ManualClock>,
    /// The engine behind the server.
    pub engine: Engine,
    /// A test owner for authenticated requests.
    pub test_owner_id: OwnerId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness after adjusting the default test configuration.
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let service_api_key = "test-service-key".to_string();

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            service_api_key: Some(service_api_key.clone()),
            allow_test_tokens: true,
            secret_pepper: "test-pepper".into(),
            sweep_interval_seconds: 0,
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let engine = Engine::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            config.engine_config().expect("valid engine config"),
        );

        let state = AppState::new(engine.clone(), config);
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            clock,
            engine,
            test_owner_id: OwnerId::generate(),
            service_api_key,
        }
    }

    /// Get the authorization header for the test owner.
    pub fn user_auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.test_owner_id)
    }

    /// Get a different owner's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        format!("Bearer test-token:{}", OwnerId::generate())
    }

    /// GET as the test owner.
    pub fn user_get(&self, path: &str) -> TestRequest {
        with_header(self.server.get(path), "authorization", &self.user_auth_header())
    }

    /// POST as the test owner.
    pub fn user_post(&self, path: &str) -> TestRequest {
        with_header(self.server.post(path), "authorization", &self.user_auth_header())
    }

    /// POST as another owner.
    pub fn other_user_post(&self, path: &str) -> TestRequest {
        with_header(self.server.post(path), "authorization", &Self::other_user_auth_header())
    }

    /// POST with the service API key.
    pub fn service_post(&self, path: &str, service_name: &str) -> TestRequest {
        let request = with_header(self.server.post(path), "x-api-key", &self.service_api_key);
        with_header(request, "x-service-name", service_name)
    }

    /// Open a wallet for the test owner and return its id.
    pub async fn open_wallet(&self, tier: &str) -> String {
        let response = self
            .user_post("/v1/wallet")
            .json(&json!({ "tier": tier }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["id"].as_str().unwrap().to_string()
    }

    /// Deliver a payment event through the webhook.
    pub async fn payment_event(&self, body: Value) -> TestResponse {
        self.service_post("/webhooks/payments", "payments")
            .json(&body)
            .await
    }

    /// Credit the wallet through a successful payment event.
    pub async fn fund(&self, wallet_id: &str, amount_minor: i64) {
        self.payment_event(json!({
            "event_id": format!("evt-{}", uuid::Uuid::new_v4()),
            "wallet_id": wallet_id,
            "status": "succeeded",
            "amount_minor": amount_minor,
        }))
        .await
        .assert_status_ok();
    }

    /// The test owner's available balance.
    pub async fn available(&self) -> i64 {
        let response = self.user_get("/v1/wallet").await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["available_minor"].as_i64().unwrap()
    }

    /// Place an order as the test owner.
    pub async fn place_order(&self, amount_minor: i64) -> Value {
        let response = self
            .user_post("/v1/orders")
            .json(&json!({ "amount_minor": amount_minor }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    /// A delivery callback for `order_id`.
    pub async fn delivery(&self, order_id: &str, action: &str, body: Value) -> TestResponse {
        self.service_post(&format!("/v1/delivery/orders/{order_id}/{action}"), "partners")
            .json(&body)
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach a header to a request.
pub fn with_header(request: TestRequest, name: &'static str, value: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static(name),
        HeaderValue::from_str(value).expect("valid header value"),
    )
}
