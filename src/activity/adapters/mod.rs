//! Adapter implementations for the memory store port.

pub mod memory;

pub use memory::InMemoryMemoryStore;
