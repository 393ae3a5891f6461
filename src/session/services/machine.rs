//! The per-session state machine task.

use super::handle::{AcceptGate, close_locked};
use super::registry::RegistrySlot;
use crate::activity::{ports::MemoryStore, services::ActivityExecutor};
use crate::operation::{Operation, SessionId};
use crate::session::{
    domain::{CloseReason, SessionEvent, SessionPhase, SessionReplay, SessionState},
    ports::SessionJournal,
};
use mockable::Clock;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Everything a session machine owns while it runs.
pub(super) struct SessionMachine<S, J, C>
where
    S: MemoryStore + 'static,
    J: SessionJournal + 'static,
    C: Clock + Send + Sync + 'static,
{
    pub(super) session_id: SessionId,
    pub(super) replay: SessionReplay,
    pub(super) executor: ActivityExecutor<S, C>,
    pub(super) journal: Arc<J>,
    pub(super) clock: Arc<C>,
    pub(super) gate: Arc<Mutex<AcceptGate>>,
    pub(super) commands: mpsc::UnboundedReceiver<Operation>,
    pub(super) snapshot: watch::Sender<SessionState>,
    pub(super) close: CancellationToken,
    pub(super) abort: CancellationToken,
    pub(super) ttl: Duration,
    pub(super) slot: RegistrySlot<J>,
}

impl<S, J, C> SessionMachine<S, J, C>
where
    S: MemoryStore + 'static,
    J: SessionJournal + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Runs until the session terminates or the machine is aborted.
    ///
    /// Operations recovered from the journal run first, then the machine
    /// serves its command queue one operation at a time.
    pub(super) async fn run(mut self) {
        let Some(reason) = self.until_closing().await else {
            self.aborted();
            return;
        };
        if self.terminate(reason).await.is_break() {
            self.aborted();
        }
    }

    async fn until_closing(&mut self) -> Option<CloseReason> {
        if self.drain_backlog().await.is_break() {
            return None;
        }
        if let Some(reason) = self.replay.close_reason {
            return Some(reason);
        }
        self.serve().await
    }

    /// Gives up the registry entry without journaling; the journal stays
    /// for the next recovery.
    fn aborted(&self) {
        debug!(session_id = %self.session_id, "session machine aborted");
        self.slot.release();
    }

    async fn drain_backlog(&mut self) -> ControlFlow<()> {
        if !self.replay.pending.is_empty() {
            info!(
                session_id = %self.session_id,
                pending = self.replay.pending.len(),
                "resuming recovered operations"
            );
        }
        while let Some(operation) = self.replay.pending.pop_front() {
            if self.process(operation).await.is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Serves commands until a close is requested or the inactivity timer
    /// expires. Returns `None` when aborted.
    async fn serve(&mut self) -> Option<CloseReason> {
        let mut idle_since = Instant::now();
        loop {
            let deadline = idle_since + self.ttl;
            tokio::select! {
                biased;
                () = self.abort.cancelled() => return None,
                () = self.close.cancelled() => {
                    let reason = self.gate.lock().await.close_reason;
                    return Some(reason.unwrap_or(CloseReason::Requested));
                }
                received = self.commands.recv() => {
                    let Some(operation) = received else {
                        return Some(CloseReason::Shutdown);
                    };
                    if self.process(operation).await.is_break() {
                        return None;
                    }
                    idle_since = Instant::now();
                }
                () = tokio::time::sleep_until(deadline) => {
                    if self.try_expire().await {
                        return Some(CloseReason::InactivityTimeout);
                    }
                    idle_since = Instant::now();
                }
            }
        }
    }

    /// Closes the gate for inactivity unless a submission is under way or
    /// operations are waiting.
    async fn try_expire(&self) -> bool {
        let Ok(mut gate) = self.gate.try_lock() else {
            return false;
        };
        if gate.close_reason.is_some() || !self.commands.is_empty() {
            return false;
        }
        if let Err(err) = close_locked(
            &mut gate,
            self.journal.as_ref(),
            &self.session_id,
            CloseReason::InactivityTimeout,
            self.clock.utc(),
        )
        .await
        {
            error!(session_id = %self.session_id, error = %err, "failed to journal inactivity close");
            gate.close_reason = Some(CloseReason::InactivityTimeout);
        }
        self.close.cancel();
        true
    }

    async fn process(&mut self, operation: Operation) -> ControlFlow<()> {
        if self.replay.is_completed(operation.operation_id()) {
            debug!(
                session_id = %self.session_id,
                operation_id = %operation.operation_id(),
                "operation already completed; skipping"
            );
            return ControlFlow::Continue(());
        }

        self.enter(SessionPhase::Processing);
        debug!(
            session_id = %self.session_id,
            operation_id = %operation.operation_id(),
            operation_type = %operation.operation_type(),
            "processing operation"
        );

        let result = tokio::select! {
            biased;
            () = self.abort.cancelled() => return ControlFlow::Break(()),
            result = self.executor.execute(&operation) => result,
        };

        let event = SessionEvent::OperationCompleted { result };
        if self.journal_completion(&operation, &event).await.is_break() {
            return ControlFlow::Break(());
        }
        self.apply(event);

        let resting = if self.close.is_cancelled() {
            SessionPhase::Closing
        } else {
            SessionPhase::Active
        };
        self.enter(resting);
        ControlFlow::Continue(())
    }

    /// Persists a result before it is applied, retrying with the activity
    /// backoff. Once retries run out the result is applied anyway; a
    /// restart may then repeat the operation.
    async fn journal_completion(
        &self,
        operation: &Operation,
        event: &SessionEvent,
    ) -> ControlFlow<()> {
        let options = self.executor.options();
        let mut attempts = 0_u32;
        loop {
            attempts = attempts.saturating_add(1);
            let Err(err) = self.journal.append(&self.session_id, event).await else {
                return ControlFlow::Continue(());
            };
            if attempts >= options.max_attempts() {
                error!(
                    session_id = %self.session_id,
                    operation_id = %operation.operation_id(),
                    attempts,
                    error = %err,
                    "failed to journal operation result"
                );
                return ControlFlow::Continue(());
            }

            let delay = options.backoff_for(attempts);
            warn!(
                session_id = %self.session_id,
                operation_id = %operation.operation_id(),
                attempt = attempts,
                ?delay,
                error = %err,
                "retrying operation result append"
            );
            tokio::select! {
                biased;
                () = self.abort.cancelled() => return ControlFlow::Break(()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn terminate(&mut self, reason: CloseReason) -> ControlFlow<()> {
        if self.replay.close_reason.is_none() {
            self.replay.close_reason = Some(reason);
        }
        self.enter(SessionPhase::Closing);
        info!(session_id = %self.session_id, %reason, "session closing");

        while let Ok(operation) = self.commands.try_recv() {
            if self.process(operation).await.is_break() {
                return ControlFlow::Break(());
            }
        }

        let event = SessionEvent::SessionTerminated {
            terminated_at: self.clock.utc(),
        };
        if let Err(err) = self.journal.append(&self.session_id, &event).await {
            error!(session_id = %self.session_id, error = %err, "failed to journal termination");
        }
        if let Err(err) = self.journal.remove(&self.session_id).await {
            error!(session_id = %self.session_id, error = %err, "failed to purge session journal");
        }

        self.apply(event);
        self.slot.release();
        self.publish();
        info!(
            session_id = %self.session_id,
            operations = self.replay.state.operations_count(),
            "session terminated"
        );
        ControlFlow::Continue(())
    }

    fn apply(&mut self, event: SessionEvent) {
        if let Err(err) = self.replay.apply(event) {
            error!(session_id = %self.session_id, error = %err, "session bookkeeping rejected event");
        }
    }

    fn enter(&mut self, phase: SessionPhase) {
        if self.replay.state.phase() != phase
            && let Err(err) = self.replay.state.transition_to(phase)
        {
            error!(session_id = %self.session_id, error = %err, "invalid session transition");
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshot
            .send_modify(|published| published.clone_from(&self.replay.state));
    }
}
