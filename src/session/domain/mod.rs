//! Session domain types.

mod config;
mod error;
mod event;
mod phase;
mod replay;
mod state;

pub use config::SessionConfig;
pub use error::{ParseSessionPhaseError, SessionDomainError};
pub use event::{CloseReason, SessionEvent};
pub use phase::SessionPhase;
pub use replay::SessionReplay;
pub use state::{DEFAULT_HISTORY_LIMIT, SessionState};
