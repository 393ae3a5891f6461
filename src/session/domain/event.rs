//! Journal events for session durability.

use crate::operation::{AgentId, Operation, OperationResult, SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a session began closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// A caller asked for the session to close.
    Requested,
    /// No operation arrived within the inactivity TTL.
    InactivityTimeout,
    /// The orchestrator is shutting down.
    Shutdown,
}

impl CloseReason {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::InactivityTimeout => "inactivity_timeout",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One durable state transition of a session.
///
/// A session's journal is the ordered list of these events; replaying it
/// rebuilds the state, the pending queue and the set of completed
/// operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new session instance started with zeroed counters.
    SessionStarted {
        /// Session identifier.
        session_id: SessionId,
        /// Owning user.
        user_id: UserId,
        /// Owning agent.
        agent_id: Option<AgentId>,
        /// History capacity.
        history_limit: usize,
        /// Start timestamp.
        started_at: DateTime<Utc>,
    },

    /// An operation joined the session queue.
    OperationAccepted {
        /// The accepted operation.
        operation: Operation,
    },

    /// An operation reached its terminal result.
    OperationCompleted {
        /// The terminal result.
        result: OperationResult,
    },

    /// The session stopped accepting operations and began draining.
    CloseRequested {
        /// Why the session is closing.
        reason: CloseReason,
        /// When the close began.
        requested_at: DateTime<Utc>,
    },

    /// The session drained its queue and terminated.
    SessionTerminated {
        /// When the session terminated.
        terminated_at: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Returns the event name used in logs and storage.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::OperationAccepted { .. } => "operation_accepted",
            Self::OperationCompleted { .. } => "operation_completed",
            Self::CloseRequested { .. } => "close_requested",
            Self::SessionTerminated { .. } => "session_terminated",
        }
    }
}
