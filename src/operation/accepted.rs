//! Operation requests and accepted operations.

use super::{AgentId, OperationId, OperationKind, SessionId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque key-value metadata attached to a payload.
pub type Metadata = Map<String, Value>;

/// Content or query text plus opaque metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationPayload {
    text: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    metadata: Metadata,
}

impl OperationPayload {
    /// Creates a payload carrying content or query text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Replaces the metadata map.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the content or query text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the metadata map.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Returns a non-empty string metadata value.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Returns an unsigned integer metadata value.
    #[must_use]
    pub fn metadata_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(Value::as_u64)
    }
}

/// Caller-side description of an operation before a session accepts it.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    /// Caller-supplied idempotency token; generated when absent.
    pub operation_id: Option<OperationId>,
    /// Requested operation type.
    pub kind: OperationKind,
    /// Owning user.
    pub user_id: UserId,
    /// Acting agent, if any.
    pub agent_id: Option<AgentId>,
    /// Content or query plus metadata.
    pub payload: OperationPayload,
}

impl OperationRequest {
    /// Creates a request with a system-generated operation identifier.
    #[must_use]
    pub fn new(
        kind: impl Into<OperationKind>,
        user_id: UserId,
        payload: OperationPayload,
    ) -> Self {
        Self {
            operation_id: None,
            kind: kind.into(),
            user_id,
            agent_id: None,
            payload,
        }
    }

    /// Sets the acting agent.
    #[must_use]
    pub fn with_agent(mut self, agent_id: Option<AgentId>) -> Self {
        self.agent_id = agent_id;
        self
    }

    /// Sets a caller-supplied idempotency token.
    #[must_use]
    pub fn with_operation_id(mut self, operation_id: OperationId) -> Self {
        self.operation_id = Some(operation_id);
        self
    }
}

/// An operation accepted into a session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    operation_id: OperationId,
    session_id: SessionId,
    operation_type: OperationKind,
    user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent_id: Option<AgentId>,
    payload: OperationPayload,
    submitted_at: DateTime<Utc>,
}

impl Operation {
    /// Accepts a request into `session_id`, stamping the logical submission
    /// time from the orchestrator's clock.
    #[must_use]
    pub fn accept(request: OperationRequest, session_id: SessionId, clock: &impl Clock) -> Self {
        let OperationRequest {
            operation_id,
            kind,
            user_id,
            agent_id,
            payload,
        } = request;

        Self {
            operation_id: operation_id.unwrap_or_else(OperationId::generate),
            session_id,
            operation_type: kind,
            user_id,
            agent_id,
            payload,
            submitted_at: clock.utc(),
        }
    }

    /// Returns the idempotency token.
    #[must_use]
    pub const fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    /// Returns the owning session.
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns the requested operation type.
    #[must_use]
    pub const fn operation_type(&self) -> &OperationKind {
        &self.operation_type
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the acting agent.
    #[must_use]
    pub const fn agent_id(&self) -> Option<&AgentId> {
        self.agent_id.as_ref()
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &OperationPayload {
        &self.payload
    }

    /// Returns the orchestrator-assigned submission time.
    #[must_use]
    pub const fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}
