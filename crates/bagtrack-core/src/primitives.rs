//! # Innate Primitives
//!
//! Compiled-in constants for the Bagtrack CORE.
//!
//! ## Primitives
//!
//! 1. **Risk thresholds**: the ceiling for variable transitions and the
//!    multipliers applied to fixed transitions.
//! 2. **Input limits**: bounds on free-text fields and batch sizes, enforced
//!    by the Ingestor before anything reaches storage.

// =============================================================================
// RISK THRESHOLDS
// =============================================================================

/// Elapsed minutes after which a variable-duration transition is MEDIUM risk.
///
/// Variable transitions (flight legs, unknown pairs) never reach HIGH.
pub const VARIABLE_CEILING_MINUTES: u32 = 180;

/// A fixed transition is MEDIUM risk once elapsed time exceeds this multiple
/// of its expected duration.
pub const MEDIUM_RISK_MULTIPLIER: u32 = 2;

/// A fixed transition is HIGH risk once elapsed time exceeds this multiple
/// of its expected duration.
pub const HIGH_RISK_MULTIPLIER: u32 = 3;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a bag tag number in bytes.
pub const MAX_TAG_LENGTH: usize = 64;

/// Maximum length of short free-text fields (names, locations, flight numbers).
pub const MAX_TEXT_LENGTH: usize = 256;

/// Maximum length of a checkpoint status note in bytes.
pub const MAX_NOTE_LENGTH: usize = 1024;

/// Maximum number of bags in a single batch scan.
pub const MAX_BATCH_SIZE: usize = 500;
