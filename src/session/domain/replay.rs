//! Rebuilding session state from its journal.

use super::{CloseReason, SessionDomainError, SessionEvent, SessionPhase, SessionState};
use crate::operation::{Operation, OperationId, SessionId};
use std::collections::{HashSet, VecDeque};

/// Session state reconstructed from journal events.
///
/// The live session machine also keeps its bookkeeping in this shape, so
/// replaying a journal and running the machine apply the same rules.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReplay {
    /// Rebuilt session state.
    pub state: SessionState,
    /// Accepted operations without a recorded result, in acceptance order.
    pub pending: VecDeque<Operation>,
    /// Every operation id the session has accepted.
    pub accepted: HashSet<OperationId>,
    /// Every operation id with a recorded result.
    pub completed: HashSet<OperationId>,
    /// Close reason, once a close was requested.
    pub close_reason: Option<CloseReason>,
    /// Whether the session reached its final phase.
    pub terminated: bool,
}

impl SessionReplay {
    /// Starts bookkeeping for a fresh session.
    #[must_use]
    pub fn new(state: SessionState) -> Self {
        Self {
            state,
            pending: VecDeque::new(),
            accepted: HashSet::new(),
            completed: HashSet::new(),
            close_reason: None,
            terminated: false,
        }
    }

    /// Rebuilds a session from its journal.
    ///
    /// Returns `None` for an empty journal. A `session_started` event
    /// discards everything before it, so a journal that outlived a previous
    /// instance replays as the newest one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::MissingStart`] when events precede the
    /// first start, [`SessionDomainError::ForeignEvent`] when an event names
    /// another session, or a transition error for an impossible sequence.
    pub fn rebuild(
        session_id: &SessionId,
        events: impl IntoIterator<Item = SessionEvent>,
    ) -> Result<Option<Self>, SessionDomainError> {
        let mut replay: Option<Self> = None;
        for event in events {
            if let SessionEvent::SessionStarted {
                session_id: started_id,
                user_id,
                agent_id,
                history_limit,
                started_at,
            } = event
            {
                ensure_same_session(session_id, &started_id)?;
                let state = SessionState::new(started_id, user_id, agent_id, history_limit, started_at);
                replay = Some(Self::new(state));
                continue;
            }

            replay
                .as_mut()
                .ok_or_else(|| SessionDomainError::MissingStart(session_id.clone()))?
                .apply(event)?;
        }
        Ok(replay)
    }

    /// Applies one post-start event.
    ///
    /// Duplicate acceptances and completions are ignored, so applying an
    /// event twice leaves the state unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::ForeignEvent`] when an event names
    /// another session, or a transition error for an impossible sequence.
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), SessionDomainError> {
        match event {
            SessionEvent::SessionStarted { session_id, .. } => {
                ensure_same_session(self.state.session_id(), &session_id)
            }
            SessionEvent::OperationAccepted { operation } => {
                ensure_same_session(self.state.session_id(), operation.session_id())?;
                self.accept(operation);
                Ok(())
            }
            SessionEvent::OperationCompleted { result } => {
                let operation_id = result.operation_id().clone();
                if self.completed.insert(operation_id.clone()) {
                    self.pending
                        .retain(|operation| operation.operation_id() != &operation_id);
                    self.state.record_result(result);
                }
                Ok(())
            }
            SessionEvent::CloseRequested { reason, .. } => {
                if self.close_reason.is_none() {
                    self.close_reason = Some(reason);
                    self.state.transition_to(SessionPhase::Closing)?;
                }
                Ok(())
            }
            SessionEvent::SessionTerminated { .. } => {
                if self.close_reason.is_none() {
                    self.close_reason = Some(CloseReason::Requested);
                    self.state.transition_to(SessionPhase::Closing)?;
                }
                if !self.terminated {
                    self.state.transition_to(SessionPhase::Terminated)?;
                    self.terminated = true;
                }
                Ok(())
            }
        }
    }

    /// Adds an operation to the pending queue unless its id was already
    /// accepted. Returns whether it was added.
    pub fn accept(&mut self, operation: Operation) -> bool {
        if !self.accepted.insert(operation.operation_id().clone()) {
            return false;
        }
        self.pending.push_back(operation);
        true
    }

    /// Returns whether `operation_id` already has a recorded result.
    #[must_use]
    pub fn is_completed(&self, operation_id: &OperationId) -> bool {
        self.completed.contains(operation_id)
    }
}

fn ensure_same_session(expected: &SessionId, found: &SessionId) -> Result<(), SessionDomainError> {
    if expected == found {
        Ok(())
    } else {
        Err(SessionDomainError::ForeignEvent {
            expected: expected.clone(),
            found: found.clone(),
        })
    }
}
