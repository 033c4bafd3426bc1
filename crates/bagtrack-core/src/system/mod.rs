//! # System Module
//!
//! Static checkpoint metadata: the stage sequence, its terminal subset and
//! the expected duration of each transition.
//!
//! Everything here is immutable, compiled-in reference data. The derivation
//! engine reads it; nothing mutates it at runtime except configuration-time
//! overrides of the transition table.

mod durations;
mod stage;

pub use durations::*;
pub use stage::*;
