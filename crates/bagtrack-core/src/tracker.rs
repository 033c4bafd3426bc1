//! # Tracker Module
//!
//! The service layer: an event store plus a state deriver.
//!
//! The tracker records scans and answers status queries. It never stores
//! derived state; every status query re-derives it from the full history at
//! the supplied evaluation time.
//!
//! ## Storage Backends
//!
//! - `InMemory`: [`MemoryStore`] (fast, volatile)
//! - `Persistent`: [`RedbStore`] (disk-backed, ACID)

use crate::derivation::{DerivedOperationalState, StateDeriver};
use crate::ingestor::Ingestor;
use crate::primitives::MAX_BATCH_SIZE;
use crate::storage::{EventStore, MemoryStore, RedbStore, StoreCounts};
use crate::system::{CheckpointStage, expected_next_stage};
use crate::{
    Bag, BagId, CheckpointEvent, EventId, NewBag, NewCheckpoint, NewScanner, Scanner, ScannerId,
    TrackerError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// ERROR LOGGING HELPERS
// =============================================================================

/// Log a storage error and fall back to the default value.
///
/// The core has no tracing dependency; the line is JSON so the app layer
/// can ship stderr alongside its own structured logs.
#[inline]
fn log_and_default<T: Default>(result: Result<T, TrackerError>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!(
                "{{\"level\":\"warn\",\"target\":\"bagtrack_core::tracker\",\"message\":\"storage error in {}: {}\"}}",
                context, e
            );
            T::default()
        }
    }
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Tracker.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    fn store(&self) -> &dyn EventStore {
        match self {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut dyn EventStore {
        match self {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
        }
    }
}

// =============================================================================
// REQUESTS AND RESULTS
// =============================================================================

/// Everything known about one bag at an evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagStatus {
    pub bag: Bag,
    pub latest_checkpoint: Option<CheckpointEvent>,
    pub history: Vec<CheckpointEvent>,
    /// Predicted next stage; `None` before the first scan or after a
    /// terminal one.
    pub next_stage: Option<CheckpointStage>,
    pub operational_state: DerivedOperationalState,
}

/// Scan where the checkpoint is inferred rather than stated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScanRequest {
    pub bag_id: BagId,
    #[serde(default)]
    pub scanner_id: Option<ScannerId>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Scan of many bags at one point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchScanRequest {
    pub bag_ids: Vec<BagId>,
    #[serde(default)]
    pub scanner_id: Option<ScannerId>,
    /// Overrides the scanner's default and the per-bag inference.
    #[serde(default)]
    pub checkpoint: Option<CheckpointStage>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Outcome of a batch scan that recorded at least one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchScanOutcome {
    pub recorded: Vec<CheckpointEvent>,
    /// One message per bag that could not be scanned.
    pub errors: Vec<String>,
}

// =============================================================================
// TRACKER
// =============================================================================

/// A Tracker combines an event store with a state deriver.
#[derive(Debug, Default)]
pub struct Tracker {
    backend: StorageBackend,
    deriver: StateDeriver,
}

impl Tracker {
    /// Create a tracker with in-memory storage and default risk settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker with persistent redb storage.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let store = RedbStore::open(path)?;
        Ok(Self {
            backend: StorageBackend::Persistent(store),
            deriver: StateDeriver::new(),
        })
    }

    /// Replace the state deriver (custom transition table or thresholds).
    #[must_use]
    pub fn with_deriver(mut self, deriver: StateDeriver) -> Self {
        self.deriver = deriver;
        self
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    #[must_use]
    pub fn deriver(&self) -> &StateDeriver {
        &self.deriver
    }

    // -------------------------------------------------------------------------
    // Bags
    // -------------------------------------------------------------------------

    /// Register a bag under a fresh identifier.
    pub fn register_bag(&mut self, new_bag: NewBag, now: DateTime<Utc>) -> Result<Bag, TrackerError> {
        Ingestor::validate_bag(&new_bag)?;
        let bag = new_bag.into_bag(BagId::generate(), now);
        self.backend.store_mut().register_bag(bag.clone())?;
        Ok(bag)
    }

    /// Lookup a bag, failing with `BagNotFound`.
    pub fn get_bag(&self, id: &BagId) -> Result<Bag, TrackerError> {
        self.backend
            .store()
            .get_bag(id)?
            .ok_or_else(|| TrackerError::BagNotFound(id.clone()))
    }

    /// Ordered history of a registered bag.
    pub fn history(&self, id: &BagId) -> Result<Vec<CheckpointEvent>, TrackerError> {
        self.get_bag(id)?;
        self.backend.store().history(id)
    }

    /// Full status of a bag, derived at `now`.
    pub fn bag_status(&self, id: &BagId, now: DateTime<Utc>) -> Result<BagStatus, TrackerError> {
        let bag = self.get_bag(id)?;
        let history = self.backend.store().history(id)?;
        let latest = history.last().cloned();
        let next_stage = expected_next_stage(latest.as_ref().map(|e| e.checkpoint));
        let operational_state = self.deriver.derive(&history, next_stage, now);

        Ok(BagStatus {
            bag,
            latest_checkpoint: latest,
            history,
            next_stage,
            operational_state,
        })
    }

    // -------------------------------------------------------------------------
    // Scans
    // -------------------------------------------------------------------------

    /// Record a scan. The scan time defaults to `now`.
    ///
    /// Any stage may follow any other; progression is not enforced.
    pub fn scan(
        &mut self,
        checkpoint: NewCheckpoint,
        now: DateTime<Utc>,
    ) -> Result<CheckpointEvent, TrackerError> {
        Ingestor::validate_checkpoint(&checkpoint)?;
        self.get_bag(&checkpoint.bag_id)?;

        let event = checkpoint.into_event(EventId::generate(), now);
        self.backend.store_mut().append_checkpoint(event.clone())?;
        Ok(event)
    }

    /// Record a scan whose checkpoint comes from the scanner or the history.
    pub fn auto_scan(
        &mut self,
        request: AutoScanRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckpointEvent, TrackerError> {
        self.get_bag(&request.bag_id)?;

        let (scanner_stage, scanner_location) = self.active_scanner_defaults(request.scanner_id.as_ref())?;
        let stage = match scanner_stage {
            Some(stage) => stage,
            None => self.inferred_stage(&request.bag_id)?,
        };

        let checkpoint = NewCheckpoint {
            bag_id: request.bag_id,
            checkpoint: stage,
            location: request.location.or(scanner_location),
            status_note: None,
            scanner_id: request.scanner_id,
            scanned_at: None,
        };
        self.scan(checkpoint, now)
    }

    /// Scan many bags at one point.
    ///
    /// Bags that cannot be scanned are reported in `errors`; the call fails
    /// with `BatchFailed` only when nothing was recorded.
    pub fn batch_scan(
        &mut self,
        request: BatchScanRequest,
        now: DateTime<Utc>,
    ) -> Result<BatchScanOutcome, TrackerError> {
        if request.bag_ids.is_empty() {
            return Err(TrackerError::InvalidInput(
                "bag_ids must not be empty".to_string(),
            ));
        }
        if request.bag_ids.len() > MAX_BATCH_SIZE {
            return Err(TrackerError::InvalidInput(format!(
                "batch of {} bags exceeds maximum {}",
                request.bag_ids.len(),
                MAX_BATCH_SIZE
            )));
        }

        let (mut fixed_stage, mut location) = (request.checkpoint, request.location);
        if fixed_stage.is_none() {
            let (scanner_stage, scanner_location) =
                self.active_scanner_defaults(request.scanner_id.as_ref())?;
            fixed_stage = scanner_stage;
            location = location.or(scanner_location);
        }

        let mut recorded = Vec::new();
        let mut errors = Vec::new();

        for bag_id in request.bag_ids {
            let stage = match fixed_stage {
                Some(stage) => Ok(stage),
                None => self.inferred_stage(&bag_id),
            };
            let result = stage.and_then(|stage| {
                let checkpoint = NewCheckpoint {
                    bag_id: bag_id.clone(),
                    checkpoint: stage,
                    location: location.clone(),
                    status_note: None,
                    scanner_id: request.scanner_id.clone(),
                    scanned_at: None,
                };
                self.scan(checkpoint, now)
            });

            match result {
                Ok(event) => recorded.push(event),
                Err(TrackerError::BagNotFound(id)) => errors.push(format!("Bag {} not found", id)),
                Err(e) => errors.push(format!("Error processing {}: {}", bag_id, e)),
            }
        }

        if recorded.is_empty() {
            return Err(TrackerError::BatchFailed(errors));
        }
        Ok(BatchScanOutcome { recorded, errors })
    }

    /// Checkpoint and location of a scanner, if it exists and is active.
    fn active_scanner_defaults(
        &self,
        scanner_id: Option<&ScannerId>,
    ) -> Result<(Option<CheckpointStage>, Option<String>), TrackerError> {
        let Some(id) = scanner_id else {
            return Ok((None, None));
        };
        match self.backend.store().get_scanner(id)? {
            Some(scanner) if scanner.is_active => {
                Ok((Some(scanner.checkpoint), Some(scanner.location)))
            }
            _ => Ok((None, None)),
        }
    }

    /// Stage an automatic scan records when nothing else decides it.
    ///
    /// CHECKIN for a new bag; otherwise the predicted next stage, or the
    /// latest stage again once the journey has ended.
    fn inferred_stage(&self, bag_id: &BagId) -> Result<CheckpointStage, TrackerError> {
        let latest = self.backend.store().latest_checkpoint(bag_id)?;
        Ok(match latest {
            Some(event) => expected_next_stage(Some(event.checkpoint)).unwrap_or(event.checkpoint),
            None => CheckpointStage::FIRST,
        })
    }

    /// Every stage, in sequence order.
    #[must_use]
    pub fn checkpoints(&self) -> Vec<CheckpointStage> {
        CheckpointStage::ALL.to_vec()
    }

    // -------------------------------------------------------------------------
    // Scanners
    // -------------------------------------------------------------------------

    /// Register a scanner under a fresh identifier. New scanners are active.
    pub fn register_scanner(
        &mut self,
        new_scanner: NewScanner,
        now: DateTime<Utc>,
    ) -> Result<Scanner, TrackerError> {
        Ingestor::validate_scanner(&new_scanner)?;
        let scanner = new_scanner.into_scanner(ScannerId::generate(), now);
        self.backend.store_mut().register_scanner(scanner.clone())?;
        Ok(scanner)
    }

    /// Lookup a scanner, failing with `ScannerNotFound`.
    pub fn get_scanner(&self, id: &ScannerId) -> Result<Scanner, TrackerError> {
        self.backend
            .store()
            .get_scanner(id)?
            .ok_or_else(|| TrackerError::ScannerNotFound(id.clone()))
    }

    pub fn list_scanners(&self, active_only: bool) -> Result<Vec<Scanner>, TrackerError> {
        self.backend.store().list_scanners(active_only)
    }

    pub fn set_scanner_active(
        &mut self,
        id: &ScannerId,
        active: bool,
    ) -> Result<Scanner, TrackerError> {
        self.backend.store_mut().set_scanner_active(id, active)
    }

    /// Record counts of the underlying store.
    pub fn counts(&self) -> Result<StoreCounts, TrackerError> {
        self.backend.store().counts()
    }

    /// Record counts, zeroed (and logged) if the store cannot be read.
    #[must_use]
    pub fn summary(&self) -> StoreCounts {
        log_and_default(self.counts(), "summary")
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::{OperationalStatus, RiskLevel};
    use crate::DeviceType;
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).single().expect("valid")
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        t0() + TimeDelta::minutes(minutes)
    }

    fn tracker_with_bag() -> (Tracker, BagId) {
        let mut tracker = Tracker::new();
        let bag = tracker
            .register_bag(NewBag::with_tag("BA123456"), t0())
            .expect("register");
        (tracker, bag.id)
    }

    fn scanner(tracker: &mut Tracker, stage: CheckpointStage) -> ScannerId {
        tracker
            .register_scanner(
                NewScanner {
                    name: "Belt 3".into(),
                    location: "Terminal 2".into(),
                    checkpoint: stage,
                    device_type: DeviceType::Barcode,
                },
                t0(),
            )
            .expect("scanner")
            .id
    }

    #[test]
    fn status_of_new_bag() {
        let (tracker, id) = tracker_with_bag();
        let status = tracker.bag_status(&id, at(5)).expect("status");
        assert!(status.history.is_empty());
        assert_eq!(status.latest_checkpoint, None);
        assert_eq!(status.next_stage, None);
        assert_eq!(status.operational_state.status_label, "Not Yet Checked In");
    }

    #[test]
    fn status_after_scan() {
        let (mut tracker, id) = tracker_with_bag();
        tracker
            .scan(NewCheckpoint::new(id.clone(), CheckpointStage::Checkin), t0())
            .expect("scan");

        let status = tracker.bag_status(&id, at(17)).expect("status");
        assert_eq!(status.next_stage, Some(CheckpointStage::SecurityCheck));
        assert_eq!(status.operational_state.risk_level, RiskLevel::High);
        assert_eq!(status.operational_state.operational_status, OperationalStatus::AtRisk);
    }

    #[test]
    fn scan_of_unknown_bag_fails() {
        let mut tracker = Tracker::new();
        let result = tracker.scan(
            NewCheckpoint::new(BagId::new("missing"), CheckpointStage::Checkin),
            t0(),
        );
        assert!(matches!(result, Err(TrackerError::BagNotFound(_))));
    }

    #[test]
    fn explicit_scan_time_is_kept() {
        let (mut tracker, id) = tracker_with_bag();
        let event = tracker
            .scan(
                NewCheckpoint::new(id, CheckpointStage::Checkin).scanned_at(at(-30)),
                t0(),
            )
            .expect("scan");
        assert_eq!(event.scanned_at, at(-30));
    }

    #[test]
    fn auto_scan_walks_the_sequence() {
        let (mut tracker, id) = tracker_with_bag();
        let request = AutoScanRequest {
            bag_id: id.clone(),
            scanner_id: None,
            location: None,
        };
        let first = tracker.auto_scan(request.clone(), at(1)).expect("auto");
        let second = tracker.auto_scan(request, at(2)).expect("auto");
        assert_eq!(first.checkpoint, CheckpointStage::Checkin);
        assert_eq!(second.checkpoint, CheckpointStage::SecurityCheck);
    }

    #[test]
    fn auto_scan_after_claim_repeats_claim() {
        let (mut tracker, id) = tracker_with_bag();
        tracker
            .scan(NewCheckpoint::new(id.clone(), CheckpointStage::Claimed), t0())
            .expect("scan");
        let event = tracker
            .auto_scan(
                AutoScanRequest {
                    bag_id: id,
                    scanner_id: None,
                    location: None,
                },
                at(1),
            )
            .expect("auto");
        assert_eq!(event.checkpoint, CheckpointStage::Claimed);
    }

    #[test]
    fn active_scanner_decides_stage_and_location() {
        let (mut tracker, id) = tracker_with_bag();
        let scanner_id = scanner(&mut tracker, CheckpointStage::Loading);

        let event = tracker
            .auto_scan(
                AutoScanRequest {
                    bag_id: id.clone(),
                    scanner_id: Some(scanner_id.clone()),
                    location: None,
                },
                at(1),
            )
            .expect("auto");
        assert_eq!(event.checkpoint, CheckpointStage::Loading);
        assert_eq!(event.location.as_deref(), Some("Terminal 2"));
        assert_eq!(event.scanner_id, Some(scanner_id.clone()));

        tracker.set_scanner_active(&scanner_id, false).expect("deactivate");
        let event = tracker
            .auto_scan(
                AutoScanRequest {
                    bag_id: id,
                    scanner_id: Some(scanner_id),
                    location: Some("Gate 9".into()),
                },
                at(2),
            )
            .expect("auto");
        // Inactive scanner: fall back to the sequence after LOADING.
        assert_eq!(event.checkpoint, CheckpointStage::LoadedOntoAircraft);
        assert_eq!(event.location.as_deref(), Some("Gate 9"));
    }

    #[test]
    fn batch_collects_errors() {
        let (mut tracker, id) = tracker_with_bag();
        let outcome = tracker
            .batch_scan(
                BatchScanRequest {
                    bag_ids: vec![id, BagId::new("ghost")],
                    scanner_id: None,
                    checkpoint: Some(CheckpointStage::Unloading),
                    location: None,
                },
                t0(),
            )
            .expect("batch");
        assert_eq!(outcome.recorded.len(), 1);
        assert_eq!(outcome.errors, vec!["Bag ghost not found".to_string()]);
    }

    #[test]
    fn batch_with_nothing_recorded_fails() {
        let mut tracker = Tracker::new();
        let result = tracker.batch_scan(
            BatchScanRequest {
                bag_ids: vec![BagId::new("a"), BagId::new("b")],
                scanner_id: None,
                checkpoint: None,
                location: None,
            },
            t0(),
        );
        assert!(matches!(
            result,
            Err(TrackerError::BatchFailed(ref errors)) if errors.len() == 2
        ));
    }

    #[test]
    fn batch_size_is_bounded() {
        let mut tracker = Tracker::new();
        let bag_ids = (0..=MAX_BATCH_SIZE).map(|i| BagId::new(i.to_string())).collect();
        let result = tracker.batch_scan(
            BatchScanRequest {
                bag_ids,
                scanner_id: None,
                checkpoint: None,
                location: None,
            },
            t0(),
        );
        assert!(matches!(result, Err(TrackerError::InvalidInput(_))));
    }

    #[test]
    fn checkpoints_in_sequence_order() {
        let stages = Tracker::new().checkpoints();
        assert_eq!(stages.len(), 11);
        assert_eq!(stages.first(), Some(&CheckpointStage::Checkin));
        assert_eq!(stages.last(), Some(&CheckpointStage::ReturnedToAgent));
    }

    #[test]
    fn counts_track_records() {
        let (mut tracker, id) = tracker_with_bag();
        scanner(&mut tracker, CheckpointStage::Checkin);
        tracker
            .scan(NewCheckpoint::new(id, CheckpointStage::Checkin), t0())
            .expect("scan");
        let counts = tracker.counts().expect("counts");
        assert_eq!(
            counts,
            StoreCounts {
                bags: 1,
                checkpoints: 1,
                scanners: 1
            }
        );
    }
}
