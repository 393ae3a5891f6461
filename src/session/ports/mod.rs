//! Ports for session persistence.

mod journal;

pub use journal::{SessionJournal, SessionJournalError, SessionJournalResult};
