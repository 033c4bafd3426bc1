//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Stage names arrive as strings and are parsed here, so an unknown stage is
//! reported as a 400 with the usual error body rather than a bare extractor
//! rejection.

use axum::http::StatusCode;
use bagtrack_core::{
    AutoScanRequest, Bag, BagId, BagStatus, BatchScanOutcome, BatchScanRequest, CheckpointEvent,
    CheckpointStage, DeviceType, NewCheckpoint, NewScanner, Scanner, ScannerId, StoreCounts,
    TrackerError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// HTTP status for a tracker error.
#[must_use]
pub fn error_status(error: &TrackerError) -> StatusCode {
    match error {
        TrackerError::BagNotFound(_) | TrackerError::ScannerNotFound(_) => StatusCode::NOT_FOUND,
        TrackerError::InvalidStage(_)
        | TrackerError::InvalidInput(_)
        | TrackerError::BatchFailed(_) => StatusCode::BAD_REQUEST,
        TrackerError::SerializationError(_)
        | TrackerError::IoError(_)
        | TrackerError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn parse_optional_stage(stage: Option<&str>) -> Result<Option<CheckpointStage>, TrackerError> {
    stage.map(str::parse).transpose()
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub bags: usize,
    pub checkpoints: usize,
    pub scanners: usize,
}

impl HealthResponse {
    pub fn with_counts(counts: StoreCounts) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            bags: counts.bags,
            checkpoints: counts.checkpoints,
            scanners: counts.scanners,
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body returned with every non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

impl From<&TrackerError> for ErrorResponse {
    fn from(error: &TrackerError) -> Self {
        Self::new(error.to_string())
    }
}

// =============================================================================
// BAG RESPONSES
// =============================================================================

/// A single registered bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BagResponse {
    pub success: bool,
    #[serde(flatten)]
    pub bag: Bag,
}

impl BagResponse {
    pub fn success(bag: Bag) -> Self {
        Self { success: true, bag }
    }
}

/// Bag status including the derived operational state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BagStatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub status: BagStatus,
}

impl BagStatusResponse {
    pub fn success(status: BagStatus) -> Self {
        Self {
            success: true,
            status,
        }
    }
}

// =============================================================================
// SCAN REQUEST/RESPONSE
// =============================================================================

/// Checkpoint scan request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub bag_id: String,
    pub checkpoint: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status_note: Option<String>,
    #[serde(default)]
    pub scanner_id: Option<String>,
    #[serde(default)]
    pub scanned_at: Option<DateTime<Utc>>,
}

impl ScanRequest {
    /// Convert to a checkpoint payload, parsing the stage name.
    pub fn to_checkpoint(&self) -> Result<NewCheckpoint, TrackerError> {
        let stage: CheckpointStage = self.checkpoint.parse()?;
        Ok(NewCheckpoint {
            bag_id: BagId::new(&self.bag_id),
            checkpoint: stage,
            location: self.location.clone(),
            status_note: self.status_note.clone(),
            scanner_id: self.scanner_id.as_deref().map(ScannerId::new),
            scanned_at: self.scanned_at,
        })
    }
}

/// Query string of an automatic scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoScanQuery {
    pub bag_id: String,
    #[serde(default)]
    pub scanner_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl AutoScanQuery {
    #[must_use]
    pub fn to_request(&self) -> AutoScanRequest {
        AutoScanRequest {
            bag_id: BagId::new(&self.bag_id),
            scanner_id: self.scanner_id.as_deref().map(ScannerId::new),
            location: self.location.clone(),
        }
    }
}

/// Batch scan request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScanBody {
    pub bag_ids: Vec<String>,
    #[serde(default)]
    pub scanner_id: Option<String>,
    #[serde(default)]
    pub checkpoint: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl BatchScanBody {
    /// Convert to a batch request, parsing the override stage if present.
    pub fn to_request(&self) -> Result<BatchScanRequest, TrackerError> {
        Ok(BatchScanRequest {
            bag_ids: self.bag_ids.iter().map(BagId::new).collect(),
            scanner_id: self.scanner_id.as_deref().map(ScannerId::new),
            checkpoint: parse_optional_stage(self.checkpoint.as_deref())?,
            location: self.location.clone(),
        })
    }
}

/// A single recorded checkpoint event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointResponse {
    pub success: bool,
    #[serde(flatten)]
    pub event: CheckpointEvent,
}

impl CheckpointResponse {
    pub fn success(event: CheckpointEvent) -> Self {
        Self {
            success: true,
            event,
        }
    }
}

/// Batch scan result; `errors` lists bags that were skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScanResponse {
    pub success: bool,
    pub recorded: Vec<CheckpointEvent>,
    pub errors: Vec<String>,
}

impl BatchScanResponse {
    pub fn success(outcome: BatchScanOutcome) -> Self {
        Self {
            success: true,
            recorded: outcome.recorded,
            errors: outcome.errors,
        }
    }
}

// =============================================================================
// SCANNER REQUEST/RESPONSE
// =============================================================================

/// Scanner registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterScannerRequest {
    pub name: String,
    pub location: String,
    pub checkpoint: String,
    #[serde(default)]
    pub device_type: Option<String>,
}

impl RegisterScannerRequest {
    /// Convert to a scanner payload, parsing stage and device type.
    pub fn to_new_scanner(&self) -> Result<NewScanner, TrackerError> {
        let device_type = match self.device_type.as_deref() {
            Some(raw) => raw.parse::<DeviceType>()?,
            None => DeviceType::default(),
        };
        Ok(NewScanner {
            name: self.name.clone(),
            location: self.location.clone(),
            checkpoint: self.checkpoint.parse()?,
            device_type,
        })
    }
}

/// Scanner list query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerListQuery {
    /// Defaults to true.
    #[serde(default)]
    pub active_only: Option<bool>,
}

/// A single scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerResponse {
    pub success: bool,
    #[serde(flatten)]
    pub scanner: Scanner,
}

impl ScannerResponse {
    pub fn success(scanner: Scanner) -> Self {
        Self {
            success: true,
            scanner,
        }
    }
}

/// Scanner list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerListResponse {
    pub success: bool,
    pub scanners: Vec<Scanner>,
}

impl ScannerListResponse {
    pub fn success(scanners: Vec<Scanner>) -> Self {
        Self {
            success: true,
            scanners,
        }
    }
}
