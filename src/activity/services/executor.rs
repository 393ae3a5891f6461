//! Bounded, retrying execution of operations against the memory store.

use crate::activity::{
    domain::{ActivityOptions, ListMemoriesRequest, StoreCall},
    ports::{MemoryStore, MemoryStoreError},
};
use crate::operation::{Operation, OperationError, OperationErrorKind, OperationResult};
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// Why a single activity attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActivityFailure {
    /// The attempt was abandoned at its deadline.
    #[error("activity abandoned after {0:?} deadline")]
    DeadlineExceeded(Duration),

    /// The store returned an error.
    #[error(transparent)]
    Store(#[from] MemoryStoreError),

    /// The attempt panicked or was cancelled.
    #[error("activity aborted unexpectedly: {0}")]
    Aborted(String),
}

impl ActivityFailure {
    /// Returns the result classification for this failure.
    #[must_use]
    pub const fn kind(&self) -> OperationErrorKind {
        match self {
            Self::DeadlineExceeded(_) => OperationErrorKind::Transient,
            Self::Store(error) if error.is_transient() => OperationErrorKind::Transient,
            Self::Store(_) => OperationErrorKind::Permanent,
            Self::Aborted(_) => OperationErrorKind::Internal,
        }
    }

    /// Returns whether another attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), OperationErrorKind::Transient)
    }

    fn from_join_error(error: &JoinError) -> Self {
        if error.is_panic() {
            Self::Aborted("store call panicked".to_owned())
        } else {
            Self::Aborted("store call was cancelled".to_owned())
        }
    }
}

/// Executes operations against a [`MemoryStore`] with a deadline per
/// attempt and a bounded retry budget.
///
/// Every call resolves to an [`OperationResult`]; failures never escape as
/// errors or panics.
pub struct ActivityExecutor<S, C>
where
    S: MemoryStore + 'static,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    options: ActivityOptions,
}

impl<S, C> Clone for ActivityExecutor<S, C>
where
    S: MemoryStore + 'static,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            options: self.options,
        }
    }
}

impl<S, C> ActivityExecutor<S, C>
where
    S: MemoryStore + 'static,
    C: Clock + Send + Sync,
{
    /// Creates an executor with the given default options.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, options: ActivityOptions) -> Self {
        Self {
            store,
            clock,
            options,
        }
    }

    /// Returns the default options.
    #[must_use]
    pub const fn options(&self) -> &ActivityOptions {
        &self.options
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Executes `operation` with the default options.
    pub async fn execute(&self, operation: &Operation) -> OperationResult {
        self.execute_with(operation, &self.options).await
    }

    /// Executes `operation` with explicit options.
    pub async fn execute_with(
        &self,
        operation: &Operation,
        options: &ActivityOptions,
    ) -> OperationResult {
        let operation_id = operation.operation_id().clone();

        let call = match StoreCall::plan(operation, options) {
            Ok(call) => call,
            Err(error) => {
                warn!(
                    operation_id = %operation_id,
                    operation_type = %operation.operation_type(),
                    error = %error,
                    "operation rejected before reaching the store"
                );
                return OperationResult::failed(operation_id, error, self.clock.utc());
            }
        };

        let outcome = self
            .run_bounded(options, move |store| {
                let attempt_call = call.clone();
                async move { dispatch(store.as_ref(), attempt_call).await }
            })
            .await;

        match outcome {
            Ok(value) => {
                info!(
                    operation_id = %operation_id,
                    operation_type = %operation.operation_type(),
                    "operation completed"
                );
                OperationResult::succeeded(operation_id, value, self.clock.utc())
            }
            Err((failure, attempts)) => {
                warn!(
                    operation_id = %operation_id,
                    operation_type = %operation.operation_type(),
                    attempts,
                    error = %failure,
                    "operation failed"
                );
                let error = OperationError::after_attempts(failure.kind(), failure.to_string(), attempts);
                OperationResult::failed(operation_id, error, self.clock.utc())
            }
        }
    }

    /// Lists memories under the same deadline and retry policy.
    ///
    /// # Errors
    ///
    /// Returns the final [`ActivityFailure`] once retries are exhausted or a
    /// non-retryable failure occurs.
    pub async fn list_memories(&self, request: ListMemoriesRequest) -> Result<Value, ActivityFailure> {
        self.run_bounded(&self.options, move |store| {
            let attempt_request = request.clone();
            async move { store.list_memories(attempt_request).await }
        })
        .await
        .map_err(|(failure, _)| failure)
    }

    /// Runs `attempt` until it succeeds, fails permanently, or exhausts the
    /// retry budget. Each attempt runs on its own task so a deadline can
    /// abandon it and a panic cannot unwind into the caller.
    async fn run_bounded<F, Fut>(
        &self,
        options: &ActivityOptions,
        attempt: F,
    ) -> Result<Value, (ActivityFailure, u32)>
    where
        F: Fn(Arc<S>) -> Fut,
        Fut: Future<Output = Result<Value, MemoryStoreError>> + Send + 'static,
    {
        let max_attempts = options.max_attempts();
        let mut attempts = 0_u32;

        loop {
            attempts = attempts.saturating_add(1);
            let failure = match self.run_attempt(options.timeout, attempt(Arc::clone(&self.store))).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if !failure.is_retryable() || attempts >= max_attempts {
                return Err((failure, attempts));
            }

            let delay = options.backoff_for(attempts);
            debug!(attempt = attempts, ?delay, error = %failure, "retrying activity");
            tokio::time::sleep(delay).await;
        }
    }

    async fn run_attempt<Fut>(&self, timeout: Duration, call: Fut) -> Result<Value, ActivityFailure>
    where
        Fut: Future<Output = Result<Value, MemoryStoreError>> + Send + 'static,
    {
        let mut handle = tokio::spawn(call);
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(result)) => result.map_err(ActivityFailure::from),
            Ok(Err(join_error)) => Err(ActivityFailure::from_join_error(&join_error)),
            Err(_) => {
                handle.abort();
                Err(ActivityFailure::DeadlineExceeded(timeout))
            }
        }
    }
}

async fn dispatch<S: MemoryStore + ?Sized>(
    store: &S,
    call: StoreCall,
) -> Result<Value, MemoryStoreError> {
    match call {
        StoreCall::Add(request) => store.add_memory(request).await,
        StoreCall::Search(request) => store.search_memory(request).await,
    }
}
