//! Health monitor timing.

use std::time::Duration;

/// Default pause between successful checks.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(120);
/// Default deadline for one check.
const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(2 * 60);
/// Default pause after a failed check.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);
/// Default number of retained records.
const DEFAULT_WINDOW: usize = 20;
/// Default pause before restarting a crashed worker.
const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Timing and retention for the health monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthMonitorConfig {
    /// Pause between checks while the store is healthy.
    pub interval: Duration,
    /// Deadline for a single check.
    pub check_timeout: Duration,
    /// Pause after a failed check.
    pub retry_delay: Duration,
    /// Capacity of the record window.
    pub window: usize,
    /// Pause before a crashed worker is restarted.
    pub restart_delay: Duration,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            window: DEFAULT_WINDOW,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }
}

impl HealthMonitorConfig {
    /// Sets the pause between successful checks.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the per-check deadline.
    #[must_use]
    pub const fn with_check_timeout(mut self, check_timeout: Duration) -> Self {
        self.check_timeout = check_timeout;
        self
    }

    /// Sets the pause after a failed check.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sets the record window capacity.
    #[must_use]
    pub const fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Sets the pause before restarting a crashed worker.
    #[must_use]
    pub const fn with_restart_delay(mut self, restart_delay: Duration) -> Self {
        self.restart_delay = restart_delay;
        self
    }
}
