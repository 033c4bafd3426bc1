//! Integration tests for the Bagtrack HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.
//! Security settings are passed explicitly so no test touches the environment.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum_test::TestServer;
use bagtrack::api::{
    ApiSecurity, AppState, BagResponse, BatchScanResponse, CheckpointResponse, ErrorResponse,
    HealthResponse, ScannerListResponse, ScannerResponse, create_router_with,
};
use bagtrack_core::{CheckpointStage, Tracker};
use chrono::{TimeDelta, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn open_security() -> ApiSecurity {
    ApiSecurity {
        api_key: None,
        rate_limit: 0,
        cors_origins: None,
    }
}

/// Create a test server with a fresh in-memory tracker.
fn create_test_server() -> TestServer {
    let router = create_router_with(AppState::new(Tracker::new()), &open_security());
    TestServer::new(router).unwrap()
}

fn create_auth_test_server(api_key: &str) -> TestServer {
    let security = ApiSecurity {
        api_key: Some(api_key.to_string()),
        ..open_security()
    };
    let router = create_router_with(AppState::new(Tracker::new()), &security);
    TestServer::new(router).unwrap()
}

async fn register_bag(server: &TestServer, tag: &str) -> String {
    let response = server
        .post("/registerBag")
        .json(&json!({ "tag_number": tag, "flight_number": "BT100" }))
        .await;
    response.assert_status_ok();
    let bag: BagResponse = response.json();
    bag.bag.id.to_string()
}

async fn register_scanner(server: &TestServer, checkpoint: &str) -> String {
    let response = server
        .post("/scanners")
        .json(&json!({
            "name": "Belt 4",
            "location": "Terminal 2",
            "checkpoint": checkpoint,
            "device_type": "rfid"
        }))
        .await;
    response.assert_status_ok();
    let scanner: ScannerResponse = response.json();
    scanner.scanner.id.to_string()
}

// =============================================================================
// HEALTH AND CHECKPOINTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(health.bags, 0);
}

#[tokio::test]
async fn test_health_counts_records() {
    let server = create_test_server();
    let bag_id = register_bag(&server, "BT000001").await;
    server
        .post("/scanCheckpoint")
        .json(&json!({ "bag_id": bag_id, "checkpoint": "CHECKIN" }))
        .await
        .assert_status_ok();

    let health: HealthResponse = server.get("/health").await.json();
    assert_eq!(health.bags, 1);
    assert_eq!(health.checkpoints, 1);
    assert_eq!(health.scanners, 0);
}

#[tokio::test]
async fn test_checkpoints_in_sequence_order() {
    let server = create_test_server();

    let response = server.get("/checkpoints").await;

    response.assert_status_ok();
    let stages: Vec<CheckpointStage> = response.json();
    assert_eq!(stages, CheckpointStage::ALL.to_vec());
    let raw: Value = server.get("/checkpoints").await.json();
    assert_eq!(raw[0], "CHECKIN");
    assert_eq!(raw[10], "RETURNED_TO_AGENT");
}

// =============================================================================
// BAG REGISTRATION AND STATUS
// =============================================================================

#[tokio::test]
async fn test_register_bag_flattens_record() {
    let server = create_test_server();

    let response = server
        .post("/registerBag")
        .json(&json!({ "tag_number": "BT123456", "passenger_name": "R. Okafor" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["tag_number"], "BT123456");
    assert_eq!(body["passenger_name"], "R. Okafor");
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_register_bag_empty_tag_rejected() {
    let server = create_test_server();

    let response = server
        .post("/registerBag")
        .json(&json!({ "tag_number": "  " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json();
    assert!(!error.success);
    assert!(error.error.contains("tag_number"));
}

#[tokio::test]
async fn test_status_unscanned_bag() {
    let server = create_test_server();
    let bag_id = register_bag(&server, "BT000002").await;

    let response = server.get(&format!("/getStatus/{}", bag_id)).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["bag"]["id"], bag_id.as_str());
    // No scan yet, so no prediction.
    assert!(body["next_stage"].is_null());
    let state = &body["operational_state"];
    assert_eq!(state["operational_status"], "AWAITING_NEXT_STAGE");
    assert_eq!(state["status_label"], "Not Yet Checked In");
    assert_eq!(state["risk_level"], "LOW");
    assert!(state["current_stage"].is_null());
    assert!(state["time_since_last_scan_minutes"].is_null());
}

#[tokio::test]
async fn test_status_unknown_bag_is_404() {
    let server = create_test_server();

    let response = server.get("/getStatus/no-such-bag").await;

    response.assert_status_not_found();
    let error: ErrorResponse = response.json();
    assert!(!error.success);
    assert!(error.error.contains("no-such-bag"));
}

// =============================================================================
// SCANS
// =============================================================================

#[tokio::test]
async fn test_fresh_scan_awaits_next_stage() {
    let server = create_test_server();
    let bag_id = register_bag(&server, "BT000003").await;

    let response = server
        .post("/scanCheckpoint")
        .json(&json!({ "bag_id": bag_id, "checkpoint": "checkin", "location": "Desk 12" }))
        .await;
    response.assert_status_ok();
    let recorded: CheckpointResponse = response.json();
    assert_eq!(recorded.event.checkpoint, CheckpointStage::Checkin);
    assert_eq!(recorded.event.location.as_deref(), Some("Desk 12"));

    let body: Value = server.get(&format!("/getStatus/{}", bag_id)).await.json();
    let state = &body["operational_state"];
    assert_eq!(state["current_stage"], "CHECKIN");
    assert_eq!(state["expected_next_stage"], "SECURITY_CHECK");
    assert_eq!(state["status_label"], "Awaiting Security Check");
    assert_eq!(state["is_delayed"], false);
}

#[tokio::test]
async fn test_overdue_scan_is_at_risk() {
    let server = create_test_server();
    let bag_id = register_bag(&server, "BT000004").await;
    let scanned_at = Utc::now() - TimeDelta::minutes(20);

    server
        .post("/scanCheckpoint")
        .json(&json!({ "bag_id": bag_id, "checkpoint": "CHECKIN", "scanned_at": scanned_at }))
        .await
        .assert_status_ok();

    let body: Value = server.get(&format!("/getStatus/{}", bag_id)).await.json();
    let state = &body["operational_state"];
    assert_eq!(state["risk_level"], "HIGH");
    assert_eq!(state["operational_status"], "AT_RISK");
    assert_eq!(state["status_label"], "At Risk - Checkin");
    assert_eq!(state["is_delayed"], true);
}

#[tokio::test]
async fn test_claimed_bag_is_completed() {
    let server = create_test_server();
    let bag_id = register_bag(&server, "BT000005").await;
    let start = Utc::now() - TimeDelta::hours(6);

    for (offset, stage) in [(0, "CHECKIN"), (30, "ARRIVAL"), (45, "CLAIMED")] {
        server
            .post("/scanCheckpoint")
            .json(&json!({
                "bag_id": bag_id,
                "checkpoint": stage,
                "scanned_at": start + TimeDelta::minutes(offset)
            }))
            .await
            .assert_status_ok();
    }

    let body: Value = server.get(&format!("/getStatus/{}", bag_id)).await.json();
    let state = &body["operational_state"];
    assert_eq!(state["operational_status"], "COMPLETED");
    assert_eq!(state["status_label"], "Journey Completed");
    assert_eq!(state["is_terminal"], true);
    assert!(state["expected_next_stage"].is_null());
    assert_eq!(body["history"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_scan_invalid_stage_is_400() {
    let server = create_test_server();
    let bag_id = register_bag(&server, "BT000006").await;

    let response = server
        .post("/scanCheckpoint")
        .json(&json!({ "bag_id": bag_id, "checkpoint": "TELEPORTED" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json();
    assert!(error.error.contains("TELEPORTED"));
}

#[tokio::test]
async fn test_scan_unknown_bag_is_404() {
    let server = create_test_server();

    let response = server
        .post("/scanCheckpoint")
        .json(&json!({ "bag_id": "ghost", "checkpoint": "CHECKIN" }))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_auto_scan_walks_the_sequence() {
    let server = create_test_server();
    let bag_id = register_bag(&server, "BT000007").await;

    let mut stages = Vec::new();
    for _ in 0..3 {
        let response = server
            .post("/scan/auto")
            .add_query_param("bag_id", &bag_id)
            .await;
        response.assert_status_ok();
        let recorded: CheckpointResponse = response.json();
        stages.push(recorded.event.checkpoint);
    }

    assert_eq!(
        stages,
        vec![
            CheckpointStage::Checkin,
            CheckpointStage::SecurityCheck,
            CheckpointStage::Transfer
        ]
    );
}

#[tokio::test]
async fn test_auto_scan_uses_scanner_checkpoint() {
    let server = create_test_server();
    let bag_id = register_bag(&server, "BT000008").await;
    let scanner_id = register_scanner(&server, "LOADING").await;

    let response = server
        .post("/scan/auto")
        .add_query_param("bag_id", &bag_id)
        .add_query_param("scanner_id", &scanner_id)
        .await;

    response.assert_status_ok();
    let recorded: CheckpointResponse = response.json();
    assert_eq!(recorded.event.checkpoint, CheckpointStage::Loading);
    assert_eq!(recorded.event.location.as_deref(), Some("Terminal 2"));
    assert_eq!(
        recorded.event.scanner_id.map(|id| id.to_string()),
        Some(scanner_id)
    );
}

// =============================================================================
// BATCH SCANS
// =============================================================================

#[tokio::test]
async fn test_batch_scan_reports_unknown_bags() {
    let server = create_test_server();
    let first = register_bag(&server, "BT000009").await;
    let second = register_bag(&server, "BT000010").await;

    let response = server
        .post("/scan/batch")
        .json(&json!({
            "bag_ids": [first, "missing-bag", second],
            "checkpoint": "TRANSFER",
            "location": "Hub"
        }))
        .await;

    response.assert_status_ok();
    let batch: BatchScanResponse = response.json();
    assert!(batch.success);
    assert_eq!(batch.recorded.len(), 2);
    assert!(
        batch
            .recorded
            .iter()
            .all(|e| e.checkpoint == CheckpointStage::Transfer)
    );
    assert_eq!(batch.errors, vec!["Bag missing-bag not found".to_string()]);
}

#[tokio::test]
async fn test_batch_scan_all_failed_is_400() {
    let server = create_test_server();

    let response = server
        .post("/scan/batch")
        .json(&json!({ "bag_ids": ["a", "b"] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let error: ErrorResponse = response.json();
    assert!(error.error.contains("Bag a not found"));
    assert!(error.error.contains("Bag b not found"));
}

#[tokio::test]
async fn test_batch_scan_empty_is_400() {
    let server = create_test_server();

    let response = server
        .post("/scan/batch")
        .json(&json!({ "bag_ids": [] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// SCANNERS
// =============================================================================

#[tokio::test]
async fn test_scanner_register_and_fetch() {
    let server = create_test_server();
    let scanner_id = register_scanner(&server, "SECURITY_CHECK").await;

    let response = server.get(&format!("/scanners/{}", scanner_id)).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["checkpoint"], "SECURITY_CHECK");
    assert_eq!(body["device_type"], "rfid");
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
async fn test_scanner_list() {
    let server = create_test_server();
    register_scanner(&server, "CHECKIN").await;
    register_scanner(&server, "LOADING").await;

    let response = server.get("/scanners").await;

    response.assert_status_ok();
    let list: ScannerListResponse = response.json();
    assert_eq!(list.scanners.len(), 2);

    let all: ScannerListResponse = server
        .get("/scanners")
        .add_query_param("active_only", false)
        .await
        .json();
    assert_eq!(all.scanners.len(), 2);
}

#[tokio::test]
async fn test_scanner_unknown_is_404() {
    let server = create_test_server();

    let response = server.get("/scanners/nope").await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_scanner_bad_device_type_is_400() {
    let server = create_test_server();

    let response = server
        .post("/scanners")
        .json(&json!({
            "name": "Belt 1",
            "location": "T1",
            "checkpoint": "CHECKIN",
            "device_type": "telepathy"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let server = create_test_server();

    let response = server.get("/unknown").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_method_not_allowed() {
    let server = create_test_server();

    // /health is GET only
    let response = server.post("/health").await;
    assert_eq!(response.status_code().as_u16(), 405);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let server = create_test_server();

    let response = server
        .post("/scanCheckpoint")
        .text("not valid json")
        .content_type("application/json")
        .await;

    assert!(response.status_code().is_client_error());
}

// =============================================================================
// CORS AND RATE LIMITING
// =============================================================================

async fn preflight_allow_origin(origin: &str) -> Option<HeaderValue> {
    let router = create_router_with(AppState::new(Tracker::new()), &open_security());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/health")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .cloned()
}

#[tokio::test]
async fn test_cors_allows_localhost_by_default() {
    let allowed = preflight_allow_origin("http://localhost:3000").await;
    assert_eq!(
        allowed,
        Some(HeaderValue::from_static("http://localhost:3000"))
    );
}

#[tokio::test]
async fn test_cors_rejects_foreign_origin_by_default() {
    assert!(preflight_allow_origin("http://evil.example").await.is_none());
}

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let security = ApiSecurity {
        rate_limit: 1,
        ..open_security()
    };
    let router = create_router_with(AppState::new(Tracker::new()), &security);
    let server = TestServer::new(router).unwrap();

    server.get("/health").await.assert_status_ok();
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/checkpoints")
        .add_header(
            header::AUTHORIZATION,
            format!("Bearer {}", api_key).parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let api_key = "test-raw-key-67890";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/checkpoints")
        .add_header(header::AUTHORIZATION, api_key.parse::<HeaderValue>().unwrap())
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/checkpoints")
        .add_header(
            header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let server = create_auth_test_server("required-key");

    let response = server
        .post("/registerBag")
        .json(&json!({ "tag_number": "BT999999" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let server = create_auth_test_server("secret-key-for-bypass-test");

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
}
