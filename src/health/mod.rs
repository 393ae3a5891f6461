//! Health monitoring for the memory store.
//!
//! One monitor runs for the whole process, independent of sessions. It
//! polls the store's health surface, keeps a rolling window of records and
//! answers status queries from its latest published snapshot.

pub mod domain;
pub mod services;
