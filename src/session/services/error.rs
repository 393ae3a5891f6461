//! Session service errors.

use crate::operation::SessionId;
use crate::session::{domain::SessionDomainError, ports::SessionJournalError};
use thiserror::Error;

/// Errors returned by session handles and the registry.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The session no longer accepts operations.
    #[error("session {0} is closed")]
    Closed(SessionId),

    /// The registry is shutting down and creates no sessions.
    #[error("session registry is shut down")]
    ShutDown,

    /// A journal operation failed.
    #[error(transparent)]
    Journal(#[from] SessionJournalError),

    /// A stored journal could not be replayed.
    #[error(transparent)]
    Replay(#[from] SessionDomainError),
}
