//! Session state aggregate.

use super::{SessionDomainError, SessionPhase};
use crate::operation::{AgentId, OperationResult, SessionId, UserId};
use crate::rolling_window::RollingWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of operation results a session keeps by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Snapshot of one session's durable state.
///
/// Mutated only by the owning session machine (or by replay while it is
/// being rebuilt); everyone else reads published snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    session_id: SessionId,
    user_id: UserId,
    agent_id: Option<AgentId>,
    created_at: DateTime<Utc>,
    operations_count: u64,
    last_operation_at: Option<DateTime<Utc>>,
    history: RollingWindow<OperationResult>,
    active: bool,
    phase: SessionPhase,
}

impl SessionState {
    /// Creates a fresh, active session with zeroed counters.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        user_id: UserId,
        agent_id: Option<AgentId>,
        history_limit: usize,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            user_id,
            agent_id,
            created_at,
            operations_count: 0,
            last_operation_at: None,
            history: RollingWindow::new(history_limit),
            active: true,
            phase: SessionPhase::Active,
        }
    }

    /// Records a terminal operation result.
    ///
    /// The result is appended to the bounded history, evicting the oldest
    /// entry when full, and the counters advance.
    pub fn record_result(&mut self, result: OperationResult) {
        self.operations_count = self.operations_count.saturating_add(1);
        self.last_operation_at = Some(result.completed_at());
        self.history.push(result);
    }

    /// Moves the session to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::InvalidPhaseTransition`] when the
    /// transition matrix forbids the move.
    pub fn transition_to(&mut self, target: SessionPhase) -> Result<(), SessionDomainError> {
        if !self.phase.can_transition_to(target) {
            return Err(SessionDomainError::InvalidPhaseTransition {
                from: self.phase.as_str().to_owned(),
                to: target.as_str().to_owned(),
            });
        }
        self.phase = target;
        self.active = target.accepts_operations();
        Ok(())
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the owning agent, if any.
    #[must_use]
    pub const fn agent_id(&self) -> Option<&AgentId> {
        self.agent_id.as_ref()
    }

    /// Returns when the session started.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns how many operations have completed, including failures.
    #[must_use]
    pub const fn operations_count(&self) -> u64 {
        self.operations_count
    }

    /// Returns when the most recent operation completed.
    #[must_use]
    pub const fn last_operation_at(&self) -> Option<DateTime<Utc>> {
        self.last_operation_at
    }

    /// Returns the most recent results, oldest first.
    #[must_use]
    pub const fn history(&self) -> &RollingWindow<OperationResult> {
        &self.history
    }

    /// Returns whether the session still accepts operations.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }
}
