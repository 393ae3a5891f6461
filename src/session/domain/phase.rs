//! Session lifecycle phases.

use super::ParseSessionPhaseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Idle, waiting for operations or the inactivity timer.
    Active,
    /// Executing exactly one operation.
    Processing,
    /// Draining accepted operations before termination.
    Closing,
    /// Final; the instance has left the registry.
    Terminated,
}

impl SessionPhase {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Processing => "processing",
            Self::Closing => "closing",
            Self::Terminated => "terminated",
        }
    }

    /// Returns whether the phase still accepts new operations.
    #[must_use]
    pub const fn accepts_operations(self) -> bool {
        matches!(self, Self::Active | Self::Processing)
    }

    /// Returns whether transition to `target` is allowed.
    ///
    /// A closing session keeps executing its drained queue, so it may move
    /// through `processing` and back without reopening.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::Processing | Self::Closing)
                | (Self::Processing, Self::Active | Self::Closing)
                | (Self::Closing, Self::Processing | Self::Closing | Self::Terminated)
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SessionPhase {
    type Error = ParseSessionPhaseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "active" => Ok(Self::Active),
            "processing" => Ok(Self::Processing),
            "closing" => Ok(Self::Closing),
            "terminated" => Ok(Self::Terminated),
            _ => Err(ParseSessionPhaseError(value.to_owned())),
        }
    }
}
