//! Memory store port consumed by the activity executor and health monitor.

use crate::activity::domain::{
    AddMemoryRequest, ListMemoriesRequest, SearchMemoryRequest, StoreHealthReport,
};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Result type for memory store operations.
pub type MemoryStoreResult<T> = Result<T, MemoryStoreError>;

/// Contract for the external memory service.
///
/// Every call is assumed to be network-fallible. Payloads are opaque JSON
/// and are passed through to operation results unchanged.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Stores new content and returns the store's record, at least `{id}`.
    async fn add_memory(&self, request: AddMemoryRequest) -> MemoryStoreResult<Value>;

    /// Searches stored content and returns `{results: [...]}`.
    async fn search_memory(&self, request: SearchMemoryRequest) -> MemoryStoreResult<Value>;

    /// Lists stored content for a user and returns `{results: [...]}`.
    async fn list_memories(&self, request: ListMemoriesRequest) -> MemoryStoreResult<Value>;

    /// Reports store health.
    async fn health_check(&self) -> MemoryStoreResult<StoreHealthReport>;
}

/// Errors returned by memory store adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// The store did not answer in time.
    #[error("memory store timed out: {0}")]
    Timeout(String),

    /// The store could not be reached.
    #[error("memory store connection failed: {0}")]
    Connection(String),

    /// The store answered with a server-side failure.
    #[error("memory store unavailable (status {status}): {message}")]
    Unavailable {
        /// Server status code, for example 503.
        status: u16,
        /// Failure detail.
        message: String,
    },

    /// The store rejected the request as invalid.
    #[error("memory store rejected request: {0}")]
    Rejected(String),
}

impl MemoryStoreError {
    /// Returns whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::Unavailable { .. }
        )
    }
}
