//! Write-ahead journal port for session state machines.

use crate::operation::SessionId;
use crate::session::domain::SessionEvent;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for session journal operations.
pub type SessionJournalResult<T> = Result<T, SessionJournalError>;

/// Append-only event storage, one ordered stream per session.
///
/// An event counts as durable once `append` returns `Ok`; session machines
/// only report a transition after its event is appended.
#[async_trait]
pub trait SessionJournal: Send + Sync {
    /// Appends `event` to the end of the session's stream.
    ///
    /// # Errors
    ///
    /// Returns [`SessionJournalError::Unavailable`] when the backing store
    /// cannot be reached, or [`SessionJournalError::Persistence`] when the
    /// write fails.
    async fn append(&self, session_id: &SessionId, event: &SessionEvent)
    -> SessionJournalResult<()>;

    /// Loads the session's events in append order.
    ///
    /// An unknown session yields an empty list.
    async fn load(&self, session_id: &SessionId) -> SessionJournalResult<Vec<SessionEvent>>;

    /// Lists every session with a stored stream.
    async fn list_sessions(&self) -> SessionJournalResult<Vec<SessionId>>;

    /// Deletes the session's stream. Removing an unknown session succeeds.
    async fn remove(&self, session_id: &SessionId) -> SessionJournalResult<()>;
}

/// Errors returned by session journal implementations.
#[derive(Debug, Clone, Error)]
pub enum SessionJournalError {
    /// The backing store cannot be reached.
    #[error("session journal unavailable: {0}")]
    Unavailable(String),

    /// Stored events could not be decoded or replayed.
    #[error("invalid persisted session data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SessionJournalError {
    /// Wraps persisted-data decoding or validation failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
