//! Session policy.

use super::DEFAULT_HISTORY_LIMIT;
use std::time::Duration;

/// Default inactivity TTL.
const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Per-session limits applied by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Idle time after which a session closes itself.
    pub ttl: Duration,
    /// Number of results kept in a session's history.
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl SessionConfig {
    /// Sets the inactivity TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the history capacity.
    #[must_use]
    pub const fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }
}
