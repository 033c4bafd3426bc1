//! # Operational Status
//!
//! Classification of a bag's journey into a single human-facing status, and
//! the label rendered from it.
//!
//! Decision order (first match wins):
//!
//! 1. nothing scanned → `AWAITING_NEXT_STAGE`
//! 2. CLAIMED → `COMPLETED`; any other terminal stage → `TERMINAL`
//! 3. IN_TRANSIT → `IN_TRANSIT` (risk is not consulted)
//! 4. HIGH risk → `AT_RISK`; MEDIUM risk → `DELAYED`
//! 5. a next stage is expected → `AWAITING_NEXT_STAGE`
//! 6. otherwise → `ON_TRACK`

use crate::derivation::RiskLevel;
use crate::system::CheckpointStage;
use crate::TrackerError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Label used when nothing has been scanned yet.
pub const NOT_CHECKED_IN_LABEL: &str = "Not Yet Checked In";

/// Label used for a status name that does not parse.
pub const UNKNOWN_STATUS_LABEL: &str = "Unknown Status";

/// High-level journey status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationalStatus {
    OnTrack,
    InTransit,
    AwaitingNextStage,
    Delayed,
    AtRisk,
    Completed,
    Terminal,
}

impl OperationalStatus {
    pub const ALL: [OperationalStatus; 7] = [
        OperationalStatus::OnTrack,
        OperationalStatus::InTransit,
        OperationalStatus::AwaitingNextStage,
        OperationalStatus::Delayed,
        OperationalStatus::AtRisk,
        OperationalStatus::Completed,
        OperationalStatus::Terminal,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalStatus::OnTrack => "ON_TRACK",
            OperationalStatus::InTransit => "IN_TRANSIT",
            OperationalStatus::AwaitingNextStage => "AWAITING_NEXT_STAGE",
            OperationalStatus::Delayed => "DELAYED",
            OperationalStatus::AtRisk => "AT_RISK",
            OperationalStatus::Completed => "COMPLETED",
            OperationalStatus::Terminal => "TERMINAL",
        }
    }
}

impl std::fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationalStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| TrackerError::InvalidInput(format!("unknown status: {}", s)))
    }
}

/// Classify the journey.
///
/// `risk` is computed lazily: terminal and in-transit bags never pay for it.
pub fn classify(
    current: Option<CheckpointStage>,
    expected_next: Option<CheckpointStage>,
    risk: impl FnOnce() -> RiskLevel,
) -> OperationalStatus {
    let Some(current) = current else {
        return OperationalStatus::AwaitingNextStage;
    };

    if current.is_terminal() {
        return if current == CheckpointStage::Claimed {
            OperationalStatus::Completed
        } else {
            OperationalStatus::Terminal
        };
    }

    if current == CheckpointStage::InTransit {
        return OperationalStatus::InTransit;
    }

    match risk() {
        RiskLevel::High => OperationalStatus::AtRisk,
        RiskLevel::Medium => OperationalStatus::Delayed,
        RiskLevel::Low if expected_next.is_some() => OperationalStatus::AwaitingNextStage,
        RiskLevel::Low => OperationalStatus::OnTrack,
    }
}

/// Render the human label for a status.
///
/// "Awaiting" names the expected next stage ("Awaiting Security Check" after
/// CHECKIN), not the current one; every other template names the current
/// stage.
#[must_use]
pub fn status_label(
    status: OperationalStatus,
    current: Option<CheckpointStage>,
    expected_next: Option<CheckpointStage>,
) -> String {
    let Some(current) = current else {
        return NOT_CHECKED_IN_LABEL.to_string();
    };
    let stage = current.display_name();

    match status {
        OperationalStatus::OnTrack => format!("On Track - {}", stage),
        OperationalStatus::InTransit => "In Transit".to_string(),
        OperationalStatus::AwaitingNextStage => {
            let awaited = expected_next.unwrap_or(current);
            format!("Awaiting {}", awaited.display_name())
        }
        OperationalStatus::Delayed => format!("Delayed at {}", stage),
        OperationalStatus::AtRisk => format!("At Risk - {}", stage),
        OperationalStatus::Completed => "Journey Completed".to_string(),
        OperationalStatus::Terminal => stage.to_string(),
    }
}

/// Render a label from a raw status name, e.g. one read back from a client.
#[must_use]
pub fn label_for_status_name(
    status: &str,
    current: Option<CheckpointStage>,
    expected_next: Option<CheckpointStage>,
) -> String {
    if current.is_none() {
        return NOT_CHECKED_IN_LABEL.to_string();
    }
    match status.parse::<OperationalStatus>() {
        Ok(status) => status_label(status, current, expected_next),
        Err(_) => UNKNOWN_STATUS_LABEL.to_string(),
    }
}
