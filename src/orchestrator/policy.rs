//! How a session id is chosen when the caller supplies none.

use crate::operation::{SessionId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned while parsing a session id policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown session id policy: {0}")]
pub struct ParseSessionIdPolicyError(pub String);

/// Session id selection for calls that name no session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionIdPolicy {
    /// Reuse `auto-session-{user_id}` for every call by the same user.
    #[default]
    DeterministicPerUser,
    /// Start a new `session-{user_id}-{hex}` session for every call.
    AlwaysCreate,
}

impl SessionIdPolicy {
    /// Returns the canonical configuration representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeterministicPerUser => "deterministic_per_user",
            Self::AlwaysCreate => "always_create",
        }
    }

    /// Chooses the session id for `user_id` under this policy.
    #[must_use]
    pub fn session_id_for(self, user_id: &UserId) -> SessionId {
        match self {
            Self::DeterministicPerUser => SessionId::auto_for(user_id),
            Self::AlwaysCreate => SessionId::generate_for(user_id),
        }
    }
}

impl fmt::Display for SessionIdPolicy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SessionIdPolicy {
    type Error = ParseSessionIdPolicyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "deterministic_per_user" | "deterministic" => Ok(Self::DeterministicPerUser),
            "always_create" | "always" => Ok(Self::AlwaysCreate),
            _ => Err(ParseSessionIdPolicyError(value.to_owned())),
        }
    }
}
