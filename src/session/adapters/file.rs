//! File-backed session journal.
//!
//! Each session is stored as one JSON-lines file inside a capability
//! directory. File names are the SHA-256 digest of the session id, so any
//! identifier maps to a safe, fixed-length name. A crash in the middle of a
//! write can leave a torn final line; it is skipped on load and truncated
//! before the next append.

use crate::operation::SessionId;
use crate::session::{
    domain::SessionEvent,
    ports::{SessionJournal, SessionJournalError, SessionJournalResult},
};
use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::{Dir, OpenOptions};
use sha2::{Digest, Sha256};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};

const STREAM_EXTENSION: &str = ".jsonl";

/// Session journal persisted as JSON-lines files.
#[derive(Debug, Clone)]
pub struct FileSessionJournal {
    dir: Arc<Dir>,
    write_lock: Arc<Mutex<()>>,
}

impl FileSessionJournal {
    /// Opens (creating if needed) a journal rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionJournalError::Unavailable`] when the directory cannot
    /// be created or opened.
    pub fn open(path: &Utf8Path) -> SessionJournalResult<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())
            .and_then(|()| Dir::open_ambient_dir(path, ambient_authority()))
            .map(Self::from_dir)
            .map_err(|err| SessionJournalError::Unavailable(format!("{path}: {err}")))
    }

    /// Uses an already opened directory.
    #[must_use]
    pub fn from_dir(dir: Dir) -> Self {
        Self {
            dir: Arc::new(dir),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn blocking<T, F>(&self, task: F) -> SessionJournalResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> SessionJournalResult<T> + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        tokio::task::spawn_blocking(move || task(&dir))
            .await
            .map_err(SessionJournalError::persistence)?
    }
}

fn stream_name(session_id: &SessionId) -> String {
    let digest = Sha256::digest(session_id.as_str().as_bytes());
    format!("{digest:x}{STREAM_EXTENSION}")
}

fn append_line(dir: &Dir, name: &str, line: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.read(true).append(true).create(true);
    let mut file = dir.open_with(name, &options)?;

    if file.metadata()?.len() > 0 {
        let mut last = [0_u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last != *b"\n" {
            let mut content = Vec::new();
            file.seek(SeekFrom::Start(0))?;
            file.read_to_end(&mut content)?;
            let keep = content
                .iter()
                .rposition(|byte| *byte == b'\n')
                .map_or(0, |index| index.saturating_add(1));
            warn!(stream = name, "truncating torn journal tail before append");
            file.set_len(u64::try_from(keep).map_err(std::io::Error::other)?)?;
        }
    }

    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_data()
}

fn read_stream(dir: &Dir, name: &str) -> SessionJournalResult<Option<String>> {
    match dir.read_to_string(name) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(SessionJournalError::persistence(err)),
    }
}

/// Decodes a stream, skipping an unterminated final line that fails to
/// parse.
fn decode_stream(name: &str, content: &str) -> SessionJournalResult<Vec<SessionEvent>> {
    let terminated = content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();
    let last_index = lines.len().saturating_sub(1);
    let mut events = Vec::with_capacity(lines.len());

    for (index, line) in lines.into_iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SessionEvent>(line) {
            Ok(event) => events.push(event),
            Err(err) if index == last_index && !terminated => {
                warn!(stream = name, error = %err, "skipping torn journal tail");
            }
            Err(err) => return Err(SessionJournalError::invalid_persisted_data(err)),
        }
    }
    Ok(events)
}

#[async_trait]
impl SessionJournal for FileSessionJournal {
    async fn append(
        &self,
        session_id: &SessionId,
        event: &SessionEvent,
    ) -> SessionJournalResult<()> {
        let line = serde_json::to_string(event).map_err(SessionJournalError::persistence)?;
        let name = stream_name(session_id);
        let _guard = self.write_lock.lock().await;
        self.blocking(move |dir| {
            append_line(dir, &name, &line).map_err(SessionJournalError::persistence)
        })
        .await
    }

    async fn load(&self, session_id: &SessionId) -> SessionJournalResult<Vec<SessionEvent>> {
        let name = stream_name(session_id);
        self.blocking(move |dir| match read_stream(dir, &name)? {
            Some(content) => decode_stream(&name, &content),
            None => Ok(Vec::new()),
        })
        .await
    }

    async fn list_sessions(&self) -> SessionJournalResult<Vec<SessionId>> {
        self.blocking(|dir| {
            let mut sessions = Vec::new();
            for entry in dir.entries().map_err(SessionJournalError::persistence)? {
                let name = entry
                    .and_then(|found| found.file_name())
                    .map_err(SessionJournalError::persistence)?;
                if !name.ends_with(STREAM_EXTENSION) {
                    continue;
                }
                let Some(content) = read_stream(dir, &name)? else {
                    continue;
                };
                let first = match decode_stream(&name, &content) {
                    Ok(events) => events.into_iter().next(),
                    Err(err) => {
                        error!(stream = %name, error = %err, "skipping unreadable journal stream");
                        continue;
                    }
                };
                match first {
                    Some(SessionEvent::SessionStarted { session_id, .. }) => {
                        sessions.push(session_id);
                    }
                    _ => warn!(stream = %name, "journal stream does not begin with a session start"),
                }
            }
            sessions.sort();
            Ok(sessions)
        })
        .await
    }

    async fn remove(&self, session_id: &SessionId) -> SessionJournalResult<()> {
        let name = stream_name(session_id);
        let _guard = self.write_lock.lock().await;
        self.blocking(move |dir| match dir.remove_file(&name) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SessionJournalError::persistence(err)),
        })
        .await
    }
}
