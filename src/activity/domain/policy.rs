//! Timeout and retry policy for activities.

use std::time::Duration;

/// Default deadline for one store invocation.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Default number of retries after the first attempt.
const DEFAULT_MAX_RETRIES: u32 = 1;
/// Default delay before the first retry.
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Upper bound for any single backoff delay.
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);
/// Result limit used when a search carries no `limit` metadata.
const DEFAULT_SEARCH_LIMIT: u32 = 5;

/// Execution bounds applied to every activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityOptions {
    /// Deadline for a single store invocation.
    pub timeout: Duration,
    /// Retries allowed after the first attempt for transient failures.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub initial_backoff: Duration,
    /// Cap applied to the doubled backoff.
    pub max_backoff: Duration,
    /// Result limit for searches without explicit `limit` metadata.
    pub default_search_limit: u32,
}

impl Default for ActivityOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            default_search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl ActivityOptions {
    /// Sets the per-invocation deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the initial and maximum backoff.
    #[must_use]
    pub const fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Total attempts allowed, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the delay before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}
