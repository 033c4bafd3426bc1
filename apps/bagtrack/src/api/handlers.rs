//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Every handler captures the wall clock once and passes it down; the
//! tracker never reads the clock itself.

use super::{
    AppState,
    types::{
        AutoScanQuery, BagResponse, BagStatusResponse, BatchScanBody, BatchScanResponse,
        CheckpointResponse, ErrorResponse, HealthResponse, RegisterScannerRequest, ScanRequest,
        ScannerListQuery, ScannerListResponse, ScannerResponse, error_status,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bagtrack_core::{BagId, CheckpointStage, NewBag, ScannerId, TrackerError};
use chrono::Utc;
use serde::Serialize;

/// Turn a tracker result into a response with the mapped status code.
fn respond<T: Serialize>(result: Result<T, TrackerError>, context: &str) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => {
            let status = error_status(&e);
            if status.is_server_error() {
                tracing::error!(event = "request_failed", context, error = %e, "{} failed", context);
            } else {
                tracing::debug!(event = "request_rejected", context, error = %e, "{} rejected", context);
            }
            (status, Json(ErrorResponse::from(&e))).into_response()
        }
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let tracker = state.tracker.read().await;
    Json(HealthResponse::with_counts(tracker.summary()))
}

// =============================================================================
// CHECKPOINTS HANDLER
// =============================================================================

/// List every checkpoint stage in sequence order.
pub async fn checkpoints_handler(State(state): State<AppState>) -> Json<Vec<CheckpointStage>> {
    let tracker = state.tracker.read().await;
    Json(tracker.checkpoints())
}

// =============================================================================
// BAG HANDLERS
// =============================================================================

/// Register a bag.
pub async fn register_bag_handler(
    State(state): State<AppState>,
    Json(request): Json<NewBag>,
) -> Response {
    let now = Utc::now();
    let mut tracker = state.tracker.write().await;
    let result = tracker.register_bag(request, now).map(|bag| {
        tracing::info!(event = "bag_registered", bag_id = %bag.id, tag = %bag.tag_number);
        BagResponse::success(bag)
    });
    respond(result, "register bag")
}

/// Bag status with derived operational state.
pub async fn status_handler(
    State(state): State<AppState>,
    Path(bag_id): Path<String>,
) -> Response {
    let now = Utc::now();
    let tracker = state.tracker.read().await;
    let result = tracker
        .bag_status(&BagId::new(bag_id), now)
        .map(BagStatusResponse::success);
    respond(result, "get status")
}

// =============================================================================
// SCAN HANDLERS
// =============================================================================

/// Record a checkpoint scan.
pub async fn scan_handler(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Response {
    let checkpoint = match request.to_checkpoint() {
        Ok(c) => c,
        Err(e) => return respond::<CheckpointResponse>(Err(e), "scan checkpoint"),
    };

    let now = Utc::now();
    let mut tracker = state.tracker.write().await;
    let result = tracker.scan(checkpoint, now).map(|recorded| {
        tracing::info!(
            event = "scan_recorded",
            bag_id = %recorded.bag_id,
            checkpoint = %recorded.checkpoint
        );
        CheckpointResponse::success(recorded)
    });
    respond(result, "scan checkpoint")
}

/// Scan where the checkpoint is inferred from the scanner or the history.
pub async fn auto_scan_handler(
    State(state): State<AppState>,
    Query(query): Query<AutoScanQuery>,
) -> Response {
    let now = Utc::now();
    let mut tracker = state.tracker.write().await;
    let result = tracker.auto_scan(query.to_request(), now).map(|recorded| {
        tracing::info!(
            event = "auto_scan_recorded",
            bag_id = %recorded.bag_id,
            checkpoint = %recorded.checkpoint
        );
        CheckpointResponse::success(recorded)
    });
    respond(result, "auto scan")
}

/// Scan many bags at once.
pub async fn batch_scan_handler(
    State(state): State<AppState>,
    Json(body): Json<BatchScanBody>,
) -> Response {
    let request = match body.to_request() {
        Ok(r) => r,
        Err(e) => return respond::<BatchScanResponse>(Err(e), "batch scan"),
    };

    let now = Utc::now();
    let mut tracker = state.tracker.write().await;
    let result = tracker.batch_scan(request, now).map(|outcome| {
        tracing::info!(
            event = "batch_scan",
            recorded = outcome.recorded.len(),
            skipped = outcome.errors.len()
        );
        BatchScanResponse::success(outcome)
    });
    respond(result, "batch scan")
}

// =============================================================================
// SCANNER HANDLERS
// =============================================================================

/// Register a scanner device.
pub async fn register_scanner_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterScannerRequest>,
) -> Response {
    let new_scanner = match request.to_new_scanner() {
        Ok(s) => s,
        Err(e) => return respond::<ScannerResponse>(Err(e), "register scanner"),
    };

    let now = Utc::now();
    let mut tracker = state.tracker.write().await;
    let result = tracker.register_scanner(new_scanner, now).map(|scanner| {
        tracing::info!(
            event = "scanner_registered",
            scanner_id = %scanner.id,
            checkpoint = %scanner.checkpoint
        );
        ScannerResponse::success(scanner)
    });
    respond(result, "register scanner")
}

/// List scanners; only active ones unless `active_only=false`.
pub async fn list_scanners_handler(
    State(state): State<AppState>,
    Query(query): Query<ScannerListQuery>,
) -> Response {
    let tracker = state.tracker.read().await;
    let result = tracker
        .list_scanners(query.active_only.unwrap_or(true))
        .map(ScannerListResponse::success);
    respond(result, "list scanners")
}

/// Scanner detail.
pub async fn get_scanner_handler(
    State(state): State<AppState>,
    Path(scanner_id): Path<String>,
) -> Response {
    let tracker = state.tracker.read().await;
    let result = tracker
        .get_scanner(&ScannerId::new(scanner_id))
        .map(ScannerResponse::success);
    respond(result, "get scanner")
}
