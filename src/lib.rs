//! Mnemo: durable session orchestration for an AI-agent memory subsystem.
//!
//! Memory operations (save, search, graph variants and entity analysis)
//! are submitted on behalf of a session. Each session runs as its own task
//! and executes its operations strictly one at a time, in acceptance order,
//! against an external memory store. Every state transition is journaled
//! first, so a restarted process resumes pending work without repeating
//! completed operations. A separate health monitor polls the store and
//! keeps a rolling window of results.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory, files)
//! - **Services**: Task-owning coordinators built on the ports
//!
//! # Modules
//!
//! - [`operation`]: Operation requests, identifiers and results
//! - [`activity`]: Bounded, retrying calls to the memory store
//! - [`session`]: Session state machines, journal and registry
//! - [`health`]: Supervised health monitor
//! - [`orchestrator`]: Façade used by request handlers
//! - [`config`]: Defaults and environment overrides
//! - [`rolling_window`]: Fixed-capacity FIFO buffer

pub mod activity;
pub mod config;
pub mod health;
pub mod operation;
pub mod orchestrator;
pub mod rolling_window;
pub mod session;
