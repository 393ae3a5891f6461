//! Health status values.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned while parsing a health status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown health status: {0}")]
pub struct ParseHealthStatusError(pub String);

/// Health of the memory subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No check has completed yet.
    Unknown,
    /// The store answered and reported itself healthy.
    Healthy,
    /// The store answered but reported partial service.
    Degraded,
    /// The check failed, timed out or the store reported itself unhealthy.
    Unhealthy,
}

impl HealthStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }

    /// Returns whether the next check should come after the shorter retry
    /// delay.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Unhealthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for HealthStatus {
    type Error = ParseHealthStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "unknown" => Ok(Self::Unknown),
            "healthy" => Ok(Self::Healthy),
            "degraded" | "partial" => Ok(Self::Degraded),
            "unhealthy" => Ok(Self::Unhealthy),
            _ => Err(ParseHealthStatusError(value.to_owned())),
        }
    }
}
