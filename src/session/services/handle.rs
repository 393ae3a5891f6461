//! Caller-side handle to a running session machine.

use super::SessionError;
use crate::operation::{Operation, OperationId, SessionId};
use crate::session::{
    domain::{CloseReason, SessionEvent, SessionPhase, SessionReplay, SessionState},
    ports::SessionJournal,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Admission state shared by a handle and its machine.
///
/// Every acceptance and the switch to closing happen under this lock, so an
/// operation is either in the command queue before the session starts
/// closing or it is refused.
#[derive(Debug, Default)]
pub(super) struct AcceptGate {
    pub(super) started: bool,
    pub(super) close_reason: Option<CloseReason>,
    accepted: HashSet<OperationId>,
}

impl AcceptGate {
    pub(super) fn fresh() -> Self {
        Self::default()
    }

    pub(super) fn recovered(replay: &SessionReplay) -> Self {
        Self {
            started: true,
            close_reason: replay.close_reason,
            accepted: replay.accepted.clone(),
        }
    }
}

/// Channels connecting a handle to its machine.
pub(super) struct HandleParts<J> {
    pub(super) session_id: SessionId,
    pub(super) instance: u64,
    pub(super) journal: Arc<J>,
    pub(super) gate: Arc<Mutex<AcceptGate>>,
    pub(super) commands: mpsc::UnboundedSender<Operation>,
    pub(super) snapshot: watch::Receiver<SessionState>,
    pub(super) close: CancellationToken,
    pub(super) abort: CancellationToken,
}

/// Cloneable handle to one live session instance.
///
/// Submitting only appends to the journal and the command queue; it never
/// waits for execution. Reads come from the latest published snapshot.
pub struct SessionHandle<J> {
    inner: Arc<HandleParts<J>>,
}

impl<J> Clone for SessionHandle<J> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<J: SessionJournal> SessionHandle<J> {
    pub(super) fn new(parts: HandleParts<J>) -> Self {
        Self {
            inner: Arc::new(parts),
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    /// Returns the registry-assigned instance number.
    #[must_use]
    pub fn instance(&self) -> u64 {
        self.inner.instance
    }

    /// Returns the latest published state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.snapshot.borrow().clone()
    }

    /// Returns a receiver that observes every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.snapshot.clone()
    }

    /// Returns whether the session stopped accepting operations.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.inner.close.is_cancelled()
    }

    /// Journals the session start if no event has been written yet.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Journal`] when the start cannot be persisted.
    pub async fn ensure_started(&self) -> Result<(), SessionError> {
        let mut gate = self.inner.gate.lock().await;
        self.start_locked(&mut gate).await
    }

    /// Accepts `operation` into the session queue.
    ///
    /// Returns `false` when an operation with the same id was accepted
    /// before; the duplicate is acknowledged and not queued again.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] when the session is closing or its
    /// machine has stopped, or [`SessionError::Journal`] when acceptance
    /// cannot be persisted.
    pub async fn submit(&self, operation: Operation) -> Result<bool, SessionError> {
        let mut gate = self.inner.gate.lock().await;
        self.accept_locked(&mut gate, operation).await
    }

    /// Accepts several operations in order without interleaving other
    /// submissions. Returns one acceptance flag per operation.
    ///
    /// # Errors
    ///
    /// Returns the first failure; operations before it stay accepted.
    pub async fn submit_all(&self, operations: Vec<Operation>) -> Result<Vec<bool>, SessionError> {
        let mut gate = self.inner.gate.lock().await;
        let mut accepted = Vec::with_capacity(operations.len());
        for operation in operations {
            accepted.push(self.accept_locked(&mut gate, operation).await?);
        }
        Ok(accepted)
    }

    /// Stops accepting operations and lets the machine drain its queue.
    ///
    /// Closing an already closing session succeeds without effect.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Journal`] when the close cannot be persisted;
    /// the session then keeps accepting operations.
    pub async fn close(&self, reason: CloseReason, at: DateTime<Utc>) -> Result<(), SessionError> {
        let mut gate = self.inner.gate.lock().await;
        close_locked(&mut gate, self.inner.journal.as_ref(), &self.inner.session_id, reason, at)
            .await?;
        self.inner.close.cancel();
        Ok(())
    }

    /// Waits until the session has terminated or its machine has stopped.
    pub async fn terminated(&self) {
        let mut snapshot = self.inner.snapshot.clone();
        if snapshot
            .wait_for(|state| state.phase() == SessionPhase::Terminated)
            .await
            .is_err()
        {
            debug!(
                session_id = %self.inner.session_id,
                "session machine stopped before terminating"
            );
        }
    }

    /// Stops the machine immediately without draining or journaling.
    pub fn abort(&self) {
        self.inner.abort.cancel();
    }

    async fn start_locked(&self, gate: &mut AcceptGate) -> Result<(), SessionError> {
        if gate.started {
            return Ok(());
        }
        let event = {
            let state = self.inner.snapshot.borrow();
            SessionEvent::SessionStarted {
                session_id: state.session_id().clone(),
                user_id: state.user_id().clone(),
                agent_id: state.agent_id().cloned(),
                history_limit: state.history().capacity(),
                started_at: state.created_at(),
            }
        };
        self.inner
            .journal
            .append(&self.inner.session_id, &event)
            .await?;
        gate.started = true;
        Ok(())
    }

    async fn accept_locked(
        &self,
        gate: &mut AcceptGate,
        operation: Operation,
    ) -> Result<bool, SessionError> {
        if gate.close_reason.is_some() {
            return Err(SessionError::Closed(self.inner.session_id.clone()));
        }
        if gate.accepted.contains(operation.operation_id()) {
            debug!(
                session_id = %self.inner.session_id,
                operation_id = %operation.operation_id(),
                "duplicate operation acknowledged"
            );
            return Ok(false);
        }
        self.start_locked(gate).await?;

        let operation_id = operation.operation_id().clone();
        let event = SessionEvent::OperationAccepted {
            operation: operation.clone(),
        };
        self.inner
            .journal
            .append(&self.inner.session_id, &event)
            .await?;
        gate.accepted.insert(operation_id);

        self.inner
            .commands
            .send(operation)
            .map_err(|_| SessionError::Closed(self.inner.session_id.clone()))?;
        Ok(true)
    }
}

/// Marks the gate closed, journaling the close when the session has a
/// durable start.
pub(super) async fn close_locked<J: SessionJournal + ?Sized>(
    gate: &mut AcceptGate,
    journal: &J,
    session_id: &SessionId,
    reason: CloseReason,
    at: DateTime<Utc>,
) -> Result<(), SessionError> {
    if gate.close_reason.is_some() {
        return Ok(());
    }
    if gate.started {
        let event = SessionEvent::CloseRequested {
            reason,
            requested_at: at,
        };
        journal.append(session_id, &event).await?;
    }
    gate.close_reason = Some(reason);
    Ok(())
}
