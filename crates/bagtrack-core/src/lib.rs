//! # bagtrack-core
//!
//! The deterministic checkpoint engine for Bagtrack.
//!
//! A bag's journey is recorded as an append-only list of checkpoint scans.
//! Everything operational staff care about (where the bag is, what should
//! happen next, whether it is late) is derived from that list on demand and
//! never stored.
//!
//! ## Architectural Constraints
//!
//! - The derivation engine is pure: evaluation time is always a parameter
//! - Derivation is total: malformed journeys are interpreted, not rejected
//! - Storage is append-only for checkpoint events
//! - No async, no network dependencies

// =============================================================================
// MODULES
// =============================================================================

pub mod derivation;
pub mod ingestor;
pub mod primitives;
pub mod storage;
pub mod system;
pub mod tracker;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Bag, BagId, CheckpointEvent, DeviceType, EventId, NewBag, NewCheckpoint, NewScanner, Scanner,
    ScannerId, TrackerError, new_uuid_v7,
};

// =============================================================================
// RE-EXPORTS: Derivation Engine
// =============================================================================

pub use derivation::{
    DerivedOperationalState, OperationalStatus, RiskAssessor, RiskLevel, RiskThresholds,
    StateDeriver, completed_stages, current_stage, derive_operational_state,
};
pub use ingestor::Ingestor;
pub use storage::{EventStore, MemoryStore, RedbStore, StoreCounts};
pub use tracker::{
    AutoScanRequest, BagStatus, BatchScanOutcome, BatchScanRequest, StorageBackend, Tracker,
};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::{
    CheckpointStage, ExpectedDuration, TransitionTable, expected_next_stage, is_terminal,
    next_sequential_stage,
};
