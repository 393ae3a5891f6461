//! Request and response shapes exchanged with the memory store.

use crate::operation::{AgentId, Metadata, OperationId, SessionId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to store new memory content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddMemoryRequest {
    /// Content to remember.
    pub content: String,
    /// Owning user.
    pub user_id: UserId,
    /// Acting agent.
    pub agent_id: Option<AgentId>,
    /// Originating session.
    pub session_id: Option<SessionId>,
    /// Opaque metadata forwarded to the store.
    pub metadata: Metadata,
    /// Operation that issued the call, for correlating late completions.
    pub correlation_id: Option<OperationId>,
}

/// Request to search stored memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMemoryRequest {
    /// Free-text query.
    pub query: String,
    /// Owning user.
    pub user_id: UserId,
    /// Acting agent.
    pub agent_id: Option<AgentId>,
    /// Originating session.
    pub session_id: Option<SessionId>,
    /// Maximum number of results.
    pub limit: u32,
    /// Entity the search is scoped to, for entity analysis.
    pub entity: Option<String>,
    /// Operation that issued the call, for correlating late completions.
    pub correlation_id: Option<OperationId>,
}

/// Request to list a user's memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMemoriesRequest {
    /// Owning user.
    pub user_id: UserId,
    /// Restrict to one agent.
    pub agent_id: Option<AgentId>,
    /// Maximum number of results.
    pub limit: Option<u32>,
}

/// Health payload reported by the memory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreHealthReport {
    /// Store-reported status string such as `healthy` or `degraded`.
    pub status: String,
    /// Opaque diagnostic detail.
    #[serde(default)]
    pub detail: Value,
}

impl StoreHealthReport {
    /// Creates a report with the given status and detail.
    #[must_use]
    pub fn new(status: impl Into<String>, detail: Value) -> Self {
        Self {
            status: status.into(),
            detail,
        }
    }

    /// Creates a `healthy` report with empty detail.
    #[must_use]
    pub fn healthy() -> Self {
        Self::new("healthy", Value::Null)
    }
}
