//! Error types for session state transitions and replay.

use crate::operation::SessionId;
use thiserror::Error;

/// Errors returned while mutating or rebuilding session state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionDomainError {
    /// Moving between two phases is not allowed.
    #[error("invalid session phase transition: {from} -> {to}")]
    InvalidPhaseTransition {
        /// Current phase.
        from: String,
        /// Requested phase.
        to: String,
    },

    /// A journal does not begin with a `session_started` event.
    #[error("journal for session {0} has events before session start")]
    MissingStart(SessionId),

    /// A journal event belongs to a different session.
    #[error("journal for session {expected} contains an event for session {found}")]
    ForeignEvent {
        /// Session whose journal was replayed.
        expected: SessionId,
        /// Session named by the offending event.
        found: SessionId,
    },
}

/// Error returned while parsing a session phase.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown session phase: {0}")]
pub struct ParseSessionPhaseError(pub String);
