//! Registry of live session machines.

use super::handle::{AcceptGate, HandleParts};
use super::machine::SessionMachine;
use super::{SessionError, SessionHandle};
use crate::activity::{ports::MemoryStore, services::ActivityExecutor};
use crate::operation::{AgentId, SessionId, UserId};
use crate::session::{
    domain::{CloseReason, SessionConfig, SessionPhase, SessionReplay, SessionState},
    ports::SessionJournal,
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type SessionMap<J> = Mutex<HashMap<SessionId, SessionHandle<J>>>;

/// A machine's claim on its registry entry.
///
/// Releasing removes the entry only while it still belongs to the same
/// instance.
pub(super) struct RegistrySlot<J> {
    sessions: Weak<SessionMap<J>>,
    session_id: SessionId,
    instance: u64,
}

impl<J: SessionJournal> RegistrySlot<J> {
    pub(super) fn release(&self) {
        let Some(sessions) = self.sessions.upgrade() else {
            return;
        };
        let mut map = sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if map
            .get(&self.session_id)
            .is_some_and(|handle| handle.instance() == self.instance)
        {
            map.remove(&self.session_id);
        }
    }
}

/// Maps session ids to their single live machine.
///
/// Creation is an atomic create-if-absent under one lock, so concurrent
/// callers for the same id share the winner's handle.
pub struct SessionRegistry<S, J, C>
where
    S: MemoryStore + 'static,
    J: SessionJournal + 'static,
    C: Clock + Send + Sync + 'static,
{
    sessions: Arc<SessionMap<J>>,
    executor: ActivityExecutor<S, C>,
    journal: Arc<J>,
    clock: Arc<C>,
    config: SessionConfig,
    next_instance: AtomicU64,
    shutting_down: AtomicBool,
    root: CancellationToken,
}

impl<S, J, C> SessionRegistry<S, J, C>
where
    S: MemoryStore + 'static,
    J: SessionJournal + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new(
        executor: ActivityExecutor<S, C>,
        journal: Arc<J>,
        clock: Arc<C>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            executor,
            journal,
            clock,
            config,
            next_instance: AtomicU64::new(1),
            shutting_down: AtomicBool::new(false),
            root: CancellationToken::new(),
        }
    }

    /// Returns the session policy.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the live handle for `session_id`, starting a fresh session
    /// when none is registered.
    ///
    /// A session that is closing is awaited until it terminates, then
    /// replaced by a fresh instance.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ShutDown`] after shutdown began, or
    /// [`SessionError::Journal`] when the session start cannot be persisted.
    pub async fn get_or_create(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        agent_id: Option<&AgentId>,
    ) -> Result<SessionHandle<J>, SessionError> {
        loop {
            if self.shutting_down.load(Ordering::Acquire) {
                return Err(SessionError::ShutDown);
            }

            let handle = {
                let mut sessions = self.lock_sessions();
                if let Some(existing) = sessions.get(session_id) {
                    existing.clone()
                } else {
                    let state = SessionState::new(
                        session_id.clone(),
                        user_id.clone(),
                        agent_id.cloned(),
                        self.config.history_limit,
                        self.clock.utc(),
                    );
                    let handle = self.spawn_instance(SessionReplay::new(state), AcceptGate::fresh());
                    sessions.insert(session_id.clone(), handle.clone());
                    info!(
                        session_id = %session_id,
                        user_id = %user_id,
                        instance = handle.instance(),
                        "session created"
                    );
                    handle
                }
            };

            if handle.is_closing() {
                handle.terminated().await;
                continue;
            }
            handle.ensure_started().await?;
            return Ok(handle);
        }
    }

    /// Returns the live handle for `session_id`, if any.
    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<SessionHandle<J>> {
        self.lock_sessions().get(session_id).cloned()
    }

    /// Deregisters `session_id` when its instance has terminated.
    ///
    /// Returns whether an entry was removed. A running instance stays
    /// registered so that two machines never serve the same id.
    pub fn remove(&self, session_id: &SessionId) -> bool {
        let mut sessions = self.lock_sessions();
        let terminated = sessions
            .get(session_id)
            .is_some_and(|handle| handle.state().phase() == SessionPhase::Terminated);
        terminated && sessions.remove(session_id).is_some()
    }

    /// Returns the number of registered sessions still accepting
    /// operations.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock_sessions()
            .values()
            .filter(|handle| !handle.is_closing())
            .count()
    }

    /// Rebuilds every journaled session that has not terminated and resumes
    /// its pending operations. Returns the number of resumed sessions.
    ///
    /// Journals that cannot be read or replayed are logged and left
    /// untouched; the remaining sessions still resume.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Journal`] when the journaled sessions cannot
    /// be listed or a terminated journal cannot be purged.
    pub async fn recover(&self) -> Result<usize, SessionError> {
        let mut resumed = 0_usize;
        for session_id in self.journal.list_sessions().await? {
            let events = match self.journal.load(&session_id).await {
                Ok(events) => events,
                Err(err) => {
                    error!(session_id = %session_id, error = %err, "skipping unreadable session journal");
                    continue;
                }
            };
            let replay = match SessionReplay::rebuild(&session_id, events) {
                Ok(Some(replay)) => replay,
                Ok(None) => continue,
                Err(err) => {
                    error!(session_id = %session_id, error = %err, "skipping unreadable session journal");
                    continue;
                }
            };

            if replay.terminated {
                self.journal.remove(&session_id).await?;
                continue;
            }

            let mut sessions = self.lock_sessions();
            if sessions.contains_key(&session_id) {
                continue;
            }
            let gate = AcceptGate::recovered(&replay);
            info!(
                session_id = %session_id,
                operations = replay.state.operations_count(),
                pending = replay.pending.len(),
                "session recovered"
            );
            let handle = self.spawn_instance(replay, gate);
            sessions.insert(session_id, handle);
            resumed = resumed.saturating_add(1);
        }
        Ok(resumed)
    }

    /// Closes every session, waits for their queues to drain and refuses
    /// new sessions afterwards.
    ///
    /// A session whose close cannot be journaled is aborted instead; its
    /// journal stays for the next recovery.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        let handles: Vec<SessionHandle<J>> = self.lock_sessions().values().cloned().collect();

        for handle in &handles {
            if let Err(err) = handle.close(CloseReason::Shutdown, self.clock.utc()).await {
                warn!(
                    session_id = %handle.session_id(),
                    error = %err,
                    "aborting session that could not close"
                );
                handle.abort();
            }
        }
        for handle in &handles {
            handle.terminated().await;
        }
        info!(sessions = handles.len(), "session registry shut down");
    }

    /// Stops every machine immediately, leaving journals for recovery.
    pub fn abort_all(&self) {
        self.shutting_down.store(true, Ordering::Release);
        self.root.cancel();
        self.lock_sessions().clear();
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionHandle<J>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_instance(&self, replay: SessionReplay, gate: AcceptGate) -> SessionHandle<J> {
        let session_id = replay.state.session_id().clone();
        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(replay.state.clone());
        let close = CancellationToken::new();
        if gate.close_reason.is_some() {
            close.cancel();
        }
        let abort = self.root.child_token();
        let gate = Arc::new(tokio::sync::Mutex::new(gate));

        let handle = SessionHandle::new(HandleParts {
            session_id: session_id.clone(),
            instance,
            journal: Arc::clone(&self.journal),
            gate: Arc::clone(&gate),
            commands: command_tx,
            snapshot: snapshot_rx,
            close: close.clone(),
            abort: abort.clone(),
        });

        let machine = SessionMachine {
            session_id: session_id.clone(),
            replay,
            executor: self.executor.clone(),
            journal: Arc::clone(&self.journal),
            clock: Arc::clone(&self.clock),
            gate,
            commands: command_rx,
            snapshot: snapshot_tx,
            close,
            abort,
            ttl: self.config.ttl,
            slot: RegistrySlot {
                sessions: Arc::downgrade(&self.sessions),
                session_id,
                instance,
            },
        };
        tokio::spawn(machine.run());
        handle
    }
}

impl<S, J, C> Drop for SessionRegistry<S, J, C>
where
    S: MemoryStore + 'static,
    J: SessionJournal + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.root.cancel();
    }
}
