//! Durable per-session operation processing.
//!
//! A session serialises the operations submitted on behalf of one user or
//! agent conversation. Every transition is written to a [`ports::SessionJournal`]
//! before it is considered complete, so a restarted process can rebuild the
//! exact state and resume the pending queue without repeating finished work.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
