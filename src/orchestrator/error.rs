//! Errors surfaced synchronously by the orchestration façade.

use crate::activity::services::ActivityFailure;
use crate::operation::{OperationDomainError, SessionId};
use crate::session::services::SessionError;
use thiserror::Error;

/// Façade-level failures.
///
/// Operation failures are never reported here; they are recorded in the
/// session history as failed results.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// No live session has this id.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The durable journal cannot be reached or the orchestrator has shut
    /// down. Persisted session state is left untouched.
    #[error("durable execution engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A caller-supplied identifier failed validation.
    #[error(transparent)]
    InvalidIdentifier(#[from] OperationDomainError),

    /// A direct memory store query failed after retries.
    #[error("memory store query failed: {0}")]
    MemoryStore(#[from] ActivityFailure),
}

impl From<SessionError> for OrchestratorError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Closed(session_id) => Self::SessionNotFound(session_id),
            SessionError::ShutDown => {
                Self::EngineUnavailable("session registry is shut down".to_owned())
            }
            SessionError::Journal(source) => Self::EngineUnavailable(source.to_string()),
            SessionError::Replay(source) => Self::EngineUnavailable(source.to_string()),
        }
    }
}
