//! # Ingestor Module
//!
//! Payload validation for everything that enters the event store.
//!
//! - Validate before any storage mutation
//! - Reject malformed or oversized input
//! - No semantic checks on stage progression: any stage may follow any other

use crate::primitives::{MAX_NOTE_LENGTH, MAX_TAG_LENGTH, MAX_TEXT_LENGTH};
use crate::{NewBag, NewCheckpoint, NewScanner, TrackerError};

/// The Ingestor validates bag, scanner and checkpoint payloads.
pub struct Ingestor;

impl Ingestor {
    /// Validate a bag registration.
    ///
    /// The tag number must be non-blank and at most `MAX_TAG_LENGTH` bytes;
    /// optional text fields are bounded by `MAX_TEXT_LENGTH`.
    pub fn validate_bag(bag: &NewBag) -> Result<(), TrackerError> {
        if bag.tag_number.trim().is_empty() {
            return Err(TrackerError::InvalidInput(
                "tag_number must not be empty".to_string(),
            ));
        }
        check_len("tag_number", &bag.tag_number, MAX_TAG_LENGTH)?;
        check_opt("passenger_name", bag.passenger_name.as_deref(), MAX_TEXT_LENGTH)?;
        check_opt("flight_number", bag.flight_number.as_deref(), MAX_TEXT_LENGTH)?;
        check_opt("origin", bag.origin.as_deref(), MAX_TEXT_LENGTH)?;
        check_opt("destination", bag.destination.as_deref(), MAX_TEXT_LENGTH)?;
        Ok(())
    }

    /// Validate a checkpoint scan payload.
    pub fn validate_checkpoint(checkpoint: &NewCheckpoint) -> Result<(), TrackerError> {
        if checkpoint.bag_id.as_str().trim().is_empty() {
            return Err(TrackerError::InvalidInput(
                "bag_id must not be empty".to_string(),
            ));
        }
        check_opt("location", checkpoint.location.as_deref(), MAX_TEXT_LENGTH)?;
        check_opt("status_note", checkpoint.status_note.as_deref(), MAX_NOTE_LENGTH)?;
        Ok(())
    }

    /// Validate a scanner registration.
    pub fn validate_scanner(scanner: &NewScanner) -> Result<(), TrackerError> {
        if scanner.name.trim().is_empty() {
            return Err(TrackerError::InvalidInput(
                "scanner name must not be empty".to_string(),
            ));
        }
        if scanner.location.trim().is_empty() {
            return Err(TrackerError::InvalidInput(
                "scanner location must not be empty".to_string(),
            ));
        }
        check_len("name", &scanner.name, MAX_TEXT_LENGTH)?;
        check_len("location", &scanner.location, MAX_TEXT_LENGTH)?;
        Ok(())
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), TrackerError> {
    if value.len() > max {
        return Err(TrackerError::InvalidInput(format!(
            "{} length {} exceeds maximum {} bytes",
            field,
            value.len(),
            max
        )));
    }
    Ok(())
}

fn check_opt(field: &str, value: Option<&str>, max: usize) -> Result<(), TrackerError> {
    match value {
        Some(v) => check_len(field, v, max),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BagId, CheckpointStage, DeviceType};

    #[test]
    fn valid_bag_accepted() {
        assert!(Ingestor::validate_bag(&NewBag::with_tag("BA123456")).is_ok());
    }

    #[test]
    fn blank_tag_rejected() {
        let result = Ingestor::validate_bag(&NewBag::with_tag("   "));
        assert!(matches!(result, Err(TrackerError::InvalidInput(_))));
    }

    #[test]
    fn oversized_tag_rejected() {
        let tag = "X".repeat(MAX_TAG_LENGTH + 1);
        assert!(Ingestor::validate_bag(&NewBag::with_tag(tag)).is_err());
    }

    #[test]
    fn oversized_note_rejected() {
        let mut checkpoint = NewCheckpoint::new(BagId::new("b"), CheckpointStage::Loading);
        checkpoint.status_note = Some("n".repeat(MAX_NOTE_LENGTH + 1));
        assert!(Ingestor::validate_checkpoint(&checkpoint).is_err());
    }

    #[test]
    fn any_stage_accepted() {
        // Progression is not policed: CHECKIN after CLAIMED is a valid payload.
        let checkpoint = NewCheckpoint::new(BagId::new("b"), CheckpointStage::Checkin);
        assert!(Ingestor::validate_checkpoint(&checkpoint).is_ok());
    }

    #[test]
    fn scanner_needs_name_and_location() {
        let scanner = NewScanner {
            name: String::new(),
            location: "T1".into(),
            checkpoint: CheckpointStage::SecurityCheck,
            device_type: DeviceType::Barcode,
        };
        assert!(Ingestor::validate_scanner(&scanner).is_err());
    }
}
