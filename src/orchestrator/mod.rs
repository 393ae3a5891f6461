//! Orchestration façade consumed by upstream request handlers.

mod error;
mod policy;
mod service;

pub use error::OrchestratorError;
pub use policy::{ParseSessionIdPolicyError, SessionIdPolicy};
pub use service::MemoryOrchestrator;
