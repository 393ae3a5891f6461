//! Health records and the monitor's published snapshot.

use super::HealthStatus;
use crate::rolling_window::RollingWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    checked_at: DateTime<Utc>,
    status: HealthStatus,
    detail: Value,
}

impl HealthRecord {
    /// Creates a record.
    #[must_use]
    pub const fn new(checked_at: DateTime<Utc>, status: HealthStatus, detail: Value) -> Self {
        Self {
            checked_at,
            status,
            detail,
        }
    }

    /// Returns when the check finished.
    #[must_use]
    pub const fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    /// Returns the observed status.
    #[must_use]
    pub const fn status(&self) -> HealthStatus {
        self.status
    }

    /// Returns the diagnostic payload.
    #[must_use]
    pub const fn detail(&self) -> &Value {
        &self.detail
    }
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Status of the latest check.
    pub status: HealthStatus,
    /// When the latest check finished.
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Checks completed since the monitor started.
    pub checks_performed: u64,
    /// Failed checks since the last non-failing one.
    pub consecutive_failures: u32,
}

impl Default for HealthSummary {
    fn default() -> Self {
        Self {
            status: HealthStatus::Unknown,
            last_checked_at: None,
            checks_performed: 0,
            consecutive_failures: 0,
        }
    }
}

/// Everything the monitor publishes after a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    summary: HealthSummary,
    history: RollingWindow<HealthRecord>,
}

impl HealthSnapshot {
    /// Creates an empty snapshot retaining up to `window` records.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            summary: HealthSummary::default(),
            history: RollingWindow::new(window),
        }
    }

    /// Folds a completed check into the summary and the window.
    pub fn record(&mut self, record: HealthRecord) {
        let summary = &mut self.summary;
        summary.status = record.status();
        summary.last_checked_at = Some(record.checked_at());
        summary.checks_performed = summary.checks_performed.saturating_add(1);
        summary.consecutive_failures = if record.status().is_failure() {
            summary.consecutive_failures.saturating_add(1)
        } else {
            0
        };
        self.history.push(record);
    }

    /// Returns the status summary.
    #[must_use]
    pub const fn summary(&self) -> &HealthSummary {
        &self.summary
    }

    /// Returns retained records, oldest first.
    #[must_use]
    pub const fn history(&self) -> &RollingWindow<HealthRecord> {
        &self.history
    }
}
