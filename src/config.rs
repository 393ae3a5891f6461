//! Orchestrator configuration.
//!
//! Every setting has a default. [`OrchestratorConfig::from_env`] overlays
//! `MNEMO_*` environment variables on those defaults; durations are given
//! in whole seconds.

use crate::activity::domain::ActivityOptions;
use crate::health::domain::HealthMonitorConfig;
use crate::orchestrator::SessionIdPolicy;
use crate::session::domain::SessionConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Inactivity TTL in seconds.
pub const ENV_SESSION_TTL_SECS: &str = "MNEMO_SESSION_TTL_SECS";
/// Session history capacity.
pub const ENV_SESSION_HISTORY_LIMIT: &str = "MNEMO_SESSION_HISTORY_LIMIT";
/// Activity deadline in seconds.
pub const ENV_ACTIVITY_TIMEOUT_SECS: &str = "MNEMO_ACTIVITY_TIMEOUT_SECS";
/// Retries after the first activity attempt.
pub const ENV_ACTIVITY_MAX_RETRIES: &str = "MNEMO_ACTIVITY_MAX_RETRIES";
/// Health check interval in seconds.
pub const ENV_HEALTH_INTERVAL_SECS: &str = "MNEMO_HEALTH_INTERVAL_SECS";
/// Health check deadline in seconds.
pub const ENV_HEALTH_TIMEOUT_SECS: &str = "MNEMO_HEALTH_TIMEOUT_SECS";
/// Delay after a failed health check in seconds.
pub const ENV_HEALTH_RETRY_DELAY_SECS: &str = "MNEMO_HEALTH_RETRY_DELAY_SECS";
/// Session id policy name.
pub const ENV_SESSION_ID_POLICY: &str = "MNEMO_SESSION_ID_POLICY";

/// Errors returned while reading configuration overrides.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Parser message.
        reason: String,
    },
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Per-session limits.
    pub session: SessionConfig,
    /// Activity deadline and retry policy.
    pub activity: ActivityOptions,
    /// Health monitor timing.
    pub health: HealthMonitorConfig,
    /// Session id selection when callers name no session.
    pub session_id_policy: SessionIdPolicy,
}

impl OrchestratorConfig {
    /// Replaces the session limits.
    #[must_use]
    pub const fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Replaces the activity policy.
    #[must_use]
    pub const fn with_activity(mut self, activity: ActivityOptions) -> Self {
        self.activity = activity;
        self
    }

    /// Replaces the health monitor timing.
    #[must_use]
    pub const fn with_health(mut self, health: HealthMonitorConfig) -> Self {
        self.health = health;
        self
    }

    /// Replaces the session id policy.
    #[must_use]
    pub const fn with_session_id_policy(mut self, policy: SessionIdPolicy) -> Self {
        self.session_id_policy = policy;
        self
    }

    /// Reads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first variable that is
    /// set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, starting from the defaults.
    ///
    /// Blank values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first variable that is
    /// set but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, ENV_SESSION_TTL_SECS)? {
            config.session.ttl = Duration::from_secs(secs);
        }
        if let Some(limit) = parse_var::<usize>(&lookup, ENV_SESSION_HISTORY_LIMIT)? {
            config.session.history_limit = limit;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_ACTIVITY_TIMEOUT_SECS)? {
            config.activity.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32>(&lookup, ENV_ACTIVITY_MAX_RETRIES)? {
            config.activity.max_retries = retries;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_HEALTH_INTERVAL_SECS)? {
            config.health.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_HEALTH_TIMEOUT_SECS)? {
            config.health.check_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_HEALTH_RETRY_DELAY_SECS)? {
            config.health.retry_delay = Duration::from_secs(secs);
        }
        if let Some(raw) = non_blank(&lookup, ENV_SESSION_ID_POLICY) {
            config.session_id_policy =
                SessionIdPolicy::try_from(raw.as_str()).map_err(|err| ConfigError::InvalidValue {
                    key: ENV_SESSION_ID_POLICY,
                    value: raw.clone(),
                    reason: err.to_string(),
                })?;
        }

        Ok(config)
    }
}

fn non_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|raw| raw.trim().to_owned())
        .filter(|raw| !raw.is_empty())
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    non_blank(lookup, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|err| ConfigError::InvalidValue {
                key,
                value: raw.clone(),
                reason: err.to_string(),
            })
        })
        .transpose()
}
