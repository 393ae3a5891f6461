//! Port contract for the external memory store.

mod memory_store;

pub use memory_store::{MemoryStore, MemoryStoreError, MemoryStoreResult};

#[cfg(test)]
pub use memory_store::MockMemoryStore;
