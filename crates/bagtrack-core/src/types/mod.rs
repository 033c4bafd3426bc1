//! # Core Type Definitions
//!
//! This module contains the record types shared by the engine, the event
//! store and the service layer:
//! - Identifiers (`BagId`, `ScannerId`, `EventId`)
//! - Records (`Bag`, `Scanner`, `CheckpointEvent`) and their creation payloads
//! - Error types (`TrackerError`)
//!
//! ## Immutability
//!
//! A `CheckpointEvent` is never modified after it is recorded. History is
//! append-only; derived state is recomputed from it on every query.

use crate::system::CheckpointStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) string.
#[must_use]
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from any string.
            #[must_use]
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Generate a fresh time-sortable identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(new_uuid_v7())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a registered bag.
    BagId
);

string_id!(
    /// Identifier of a registered scanning device.
    ScannerId
);

string_id!(
    /// Identifier of a single recorded checkpoint event.
    EventId
);

// =============================================================================
// BAG
// =============================================================================

/// A registered bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bag {
    pub id: BagId,
    pub tag_number: String,
    pub passenger_name: Option<String>,
    pub flight_number: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub registered_at: DateTime<Utc>,
}

/// Payload for registering a bag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBag {
    pub tag_number: String,
    #[serde(default)]
    pub passenger_name: Option<String>,
    #[serde(default)]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

impl NewBag {
    /// Payload with only a tag number.
    #[must_use]
    pub fn with_tag(tag_number: impl Into<String>) -> Self {
        Self {
            tag_number: tag_number.into(),
            ..Self::default()
        }
    }

    /// Materialize the record.
    #[must_use]
    pub fn into_bag(self, id: BagId, registered_at: DateTime<Utc>) -> Bag {
        Bag {
            id,
            tag_number: self.tag_number,
            passenger_name: self.passenger_name,
            flight_number: self.flight_number,
            origin: self.origin,
            destination: self.destination,
            registered_at,
        }
    }
}

// =============================================================================
// SCANNER
// =============================================================================

/// Kind of scanning device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Barcode,
    Qr,
    Rfid,
    Manual,
}

impl DeviceType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Barcode => "barcode",
            DeviceType::Qr => "qr",
            DeviceType::Rfid => "rfid",
            DeviceType::Manual => "manual",
        }
    }
}

impl std::str::FromStr for DeviceType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "barcode" => Ok(DeviceType::Barcode),
            "qr" => Ok(DeviceType::Qr),
            "rfid" => Ok(DeviceType::Rfid),
            "manual" => Ok(DeviceType::Manual),
            other => Err(TrackerError::InvalidInput(format!(
                "unknown device type: {}",
                other
            ))),
        }
    }
}

/// A scanning device registered at a fixed location.
///
/// The scanner's `checkpoint` is the stage recorded when it scans a bag
/// without an explicit override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scanner {
    pub id: ScannerId,
    pub name: String,
    pub location: String,
    pub checkpoint: CheckpointStage,
    pub device_type: DeviceType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for registering a scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScanner {
    pub name: String,
    pub location: String,
    pub checkpoint: CheckpointStage,
    #[serde(default)]
    pub device_type: DeviceType,
}

impl NewScanner {
    #[must_use]
    pub fn into_scanner(self, id: ScannerId, created_at: DateTime<Utc>) -> Scanner {
        Scanner {
            id,
            name: self.name,
            location: self.location,
            checkpoint: self.checkpoint,
            device_type: self.device_type,
            is_active: true,
            created_at,
        }
    }
}

// =============================================================================
// CHECKPOINT EVENT
// =============================================================================

/// An immutable record of a single scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEvent {
    pub id: EventId,
    pub bag_id: BagId,
    pub checkpoint: CheckpointStage,
    pub scanned_at: DateTime<Utc>,
    pub location: Option<String>,
    pub scanner_id: Option<ScannerId>,
    pub status_note: Option<String>,
}

impl CheckpointEvent {
    /// Minimal event, mostly useful for building histories in tests and
    /// benchmarks.
    #[must_use]
    pub fn at(bag_id: BagId, checkpoint: CheckpointStage, scanned_at: DateTime<Utc>) -> Self {
        Self {
            id: EventId::generate(),
            bag_id,
            checkpoint,
            scanned_at,
            location: None,
            scanner_id: None,
            status_note: None,
        }
    }
}

/// Payload for recording a checkpoint scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCheckpoint {
    pub bag_id: BagId,
    pub checkpoint: CheckpointStage,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status_note: Option<String>,
    #[serde(default)]
    pub scanner_id: Option<ScannerId>,
    /// Scan time; the recording time is used when absent.
    #[serde(default)]
    pub scanned_at: Option<DateTime<Utc>>,
}

impl NewCheckpoint {
    #[must_use]
    pub fn new(bag_id: BagId, checkpoint: CheckpointStage) -> Self {
        Self {
            bag_id,
            checkpoint,
            location: None,
            status_note: None,
            scanner_id: None,
            scanned_at: None,
        }
    }

    #[must_use]
    pub fn scanned_at(mut self, at: DateTime<Utc>) -> Self {
        self.scanned_at = Some(at);
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Materialize the event, stamping `now` if no scan time was given.
    #[must_use]
    pub fn into_event(self, id: EventId, now: DateTime<Utc>) -> CheckpointEvent {
        CheckpointEvent {
            id,
            bag_id: self.bag_id,
            checkpoint: self.checkpoint,
            scanned_at: self.scanned_at.unwrap_or(now),
            location: self.location,
            scanner_id: self.scanner_id,
            status_note: self.status_note,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Bagtrack system.
///
/// The derivation engine itself is total and never produces one of these;
/// they come from parsing, validation and storage.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A stage name outside the checkpoint enumeration.
    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    /// A payload failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested bag is not registered.
    #[error("Bag not found: {0}")]
    BagNotFound(BagId),

    /// The requested scanner is not registered.
    #[error("Scanner not found: {0}")]
    ScannerNotFound(ScannerId),

    /// Every item of a batch failed.
    #[error("Batch failed: {}", .0.join("; "))]
    BatchFailed(Vec<String>),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage engine error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================
