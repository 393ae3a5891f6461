//! In-memory session journal.

use crate::operation::SessionId;
use crate::session::{
    domain::SessionEvent,
    ports::{SessionJournal, SessionJournalError, SessionJournalResult},
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe in-memory session journal.
///
/// Clones share storage, so a clone handed to a second orchestrator sees
/// what the first one wrote. That makes it usable for restart tests in a
/// single process. The journal can also be switched offline to simulate an
/// unreachable substrate.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionJournal {
    state: Arc<RwLock<InMemoryJournalState>>,
}

#[derive(Debug, Default)]
struct InMemoryJournalState {
    streams: BTreeMap<SessionId, Vec<SessionEvent>>,
    offline: bool,
    failing_appends: usize,
}

impl InMemorySessionJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with
    /// [`SessionJournalError::Unavailable`] until switched back.
    ///
    /// # Errors
    ///
    /// Returns [`SessionJournalError::Persistence`] when the lock is
    /// poisoned.
    pub fn set_offline(&self, offline: bool) -> SessionJournalResult<()> {
        self.write_state()?.offline = offline;
        Ok(())
    }

    /// Makes the next `count` appends fail with
    /// [`SessionJournalError::Unavailable`] without storing anything.
    ///
    /// # Errors
    ///
    /// Returns [`SessionJournalError::Persistence`] when the lock is
    /// poisoned.
    pub fn fail_next_appends(&self, count: usize) -> SessionJournalResult<()> {
        self.write_state()?.failing_appends = count;
        Ok(())
    }

    /// Returns a copy of the stored events for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionJournalError::Persistence`] when the lock is
    /// poisoned.
    pub fn events(&self, session_id: &SessionId) -> SessionJournalResult<Vec<SessionEvent>> {
        Ok(self
            .read_state()?
            .streams
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    fn read_state(&self) -> SessionJournalResult<RwLockReadGuard<'_, InMemoryJournalState>> {
        self.state
            .read()
            .map_err(|err| SessionJournalError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write_state(&self) -> SessionJournalResult<RwLockWriteGuard<'_, InMemoryJournalState>> {
        self.state
            .write()
            .map_err(|err| SessionJournalError::persistence(std::io::Error::other(err.to_string())))
    }

    fn online_read(&self) -> SessionJournalResult<RwLockReadGuard<'_, InMemoryJournalState>> {
        let state = self.read_state()?;
        if state.offline {
            return Err(SessionJournalError::Unavailable("in-memory journal is offline".to_owned()));
        }
        Ok(state)
    }

    fn online_write(&self) -> SessionJournalResult<RwLockWriteGuard<'_, InMemoryJournalState>> {
        let state = self.write_state()?;
        if state.offline {
            return Err(SessionJournalError::Unavailable("in-memory journal is offline".to_owned()));
        }
        Ok(state)
    }
}

#[async_trait]
impl SessionJournal for InMemorySessionJournal {
    async fn append(
        &self,
        session_id: &SessionId,
        event: &SessionEvent,
    ) -> SessionJournalResult<()> {
        let mut state = self.online_write()?;
        if state.failing_appends > 0 {
            state.failing_appends = state.failing_appends.saturating_sub(1);
            return Err(SessionJournalError::Unavailable(
                "in-memory journal rejected the append".to_owned(),
            ));
        }
        state
            .streams
            .entry(session_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn load(&self, session_id: &SessionId) -> SessionJournalResult<Vec<SessionEvent>> {
        Ok(self
            .online_read()?
            .streams
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_sessions(&self) -> SessionJournalResult<Vec<SessionId>> {
        Ok(self.online_read()?.streams.keys().cloned().collect())
    }

    async fn remove(&self, session_id: &SessionId) -> SessionJournalResult<()> {
        self.online_write()?.streams.remove(session_id);
        Ok(())
    }
}
