//! Identifier newtypes for operations, sessions, users, and agents.
//!
//! Session, user, and agent identifiers arrive from upstream request
//! handlers as free-form strings, so they are validated text rather than
//! UUIDs. Operation identifiers double as idempotency tokens.

use super::OperationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum identifier length accepted by the orchestrator.
const MAX_IDENTIFIER_LENGTH: usize = 200;

fn validate_identifier(
    kind: &'static str,
    value: impl Into<String>,
) -> Result<String, OperationDomainError> {
    let normalized = value.into().trim().to_owned();

    if normalized.is_empty() {
        return Err(OperationDomainError::EmptyIdentifier { kind });
    }

    if normalized.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(OperationDomainError::IdentifierTooLong {
            kind,
            limit: MAX_IDENTIFIER_LENGTH,
            value: normalized,
        });
    }

    if normalized.chars().any(char::is_control) {
        return Err(OperationDomainError::InvalidIdentifier {
            kind,
            value: normalized,
        });
    }

    Ok(normalized)
}

fn short_hex() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple.chars().take(8).collect()
}

/// Globally unique operation identifier and idempotency token.
///
/// # Examples
///
/// ```
/// use mnemo::operation::OperationId;
///
/// let id = OperationId::generate();
/// assert!(id.as_str().starts_with("op-"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Creates a validated operation identifier from caller input.
    ///
    /// # Errors
    ///
    /// Returns [`OperationDomainError`] when the value is empty, too long, or
    /// contains control characters.
    pub fn new(value: impl Into<String>) -> Result<Self, OperationDomainError> {
        validate_identifier("operation_id", value).map(Self)
    }

    /// Generates a fresh system-assigned identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("op-{}", Uuid::new_v4().simple()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OperationId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Stable identifier of a logical memory session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a validated session identifier.
    ///
    /// # Errors
    ///
    /// Returns [`OperationDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, OperationDomainError> {
        validate_identifier("session_id", value).map(Self)
    }

    /// Generates a fresh identifier of the form `session-{user}-{8 hex}`.
    #[must_use]
    pub fn generate_for(user_id: &UserId) -> Self {
        Self(format!("session-{user_id}-{}", short_hex()))
    }

    /// Returns the deterministic per-user identifier `auto-session-{user}`.
    #[must_use]
    pub fn auto_for(user_id: &UserId) -> Self {
        Self(format!("auto-session-{user_id}"))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier of the user owning a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a validated user identifier.
    ///
    /// # Errors
    ///
    /// Returns [`OperationDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, OperationDomainError> {
        validate_identifier("user_id", value).map(Self)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier of the agent acting within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates a validated agent identifier.
    ///
    /// # Errors
    ///
    /// Returns [`OperationDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, OperationDomainError> {
        validate_identifier("agent_id", value).map(Self)
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
