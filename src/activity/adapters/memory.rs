//! In-process memory store adapter.

use crate::activity::{
    domain::{AddMemoryRequest, ListMemoriesRequest, SearchMemoryRequest, StoreHealthReport},
    ports::{MemoryStore, MemoryStoreError, MemoryStoreResult},
};
use crate::operation::{AgentId, Metadata, OperationId, SessionId, UserId};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use uuid::Uuid;

/// In-memory memory store.
///
/// Keeps memories in a vector and matches searches by shared terms. It
/// records how often each operation reached the store and how many calls
/// per session were in flight at once, and it can inject failures and
/// latency. Suitable for tests and local deterministic runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

#[derive(Debug, Clone)]
struct StoredMemory {
    id: String,
    content: String,
    user_id: UserId,
    agent_id: Option<AgentId>,
    session_id: Option<SessionId>,
    metadata: Metadata,
}

impl StoredMemory {
    fn to_json(&self, score: Option<usize>) -> Value {
        let mut value = json!({
            "id": self.id,
            "memory": self.content,
            "user_id": self.user_id,
            "agent_id": self.agent_id,
            "session_id": self.session_id,
            "metadata": self.metadata,
        });
        if let (Some(score), Some(object)) = (score, value.as_object_mut()) {
            object.insert("score".to_owned(), json!(score));
        }
        value
    }

    fn visible_to(&self, user_id: &UserId, agent_id: Option<&AgentId>) -> bool {
        &self.user_id == user_id && agent_id.is_none_or(|agent| self.agent_id.as_ref() == Some(agent))
    }
}

#[derive(Debug, Default)]
struct StoreState {
    memories: Vec<StoredMemory>,
    invocations: HashMap<OperationId, usize>,
    invocation_log: Vec<OperationId>,
    in_flight: HashMap<SessionId, usize>,
    max_in_flight: HashMap<SessionId, usize>,
    scripted_failures: VecDeque<MemoryStoreError>,
    latency: Duration,
    health: Option<MemoryStoreResult<StoreHealthReport>>,
    health_latency: Duration,
    health_checks: usize,
}

impl InMemoryMemoryStore {
    /// Creates an empty store that reports itself healthy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a failure returned by the next data call.
    ///
    /// Queued failures are consumed in order, one per call.
    pub fn fail_next(&self, error: MemoryStoreError) {
        self.write().scripted_failures.push_back(error);
    }

    /// Delays every data call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.write().latency = latency;
    }

    /// Fixes the outcome of subsequent health checks.
    pub fn set_health(&self, outcome: MemoryStoreResult<StoreHealthReport>) {
        self.write().health = Some(outcome);
    }

    /// Delays every health check by `latency`.
    pub fn set_health_latency(&self, latency: Duration) {
        self.write().health_latency = latency;
    }

    /// Returns how many times calls issued by `operation_id` reached the
    /// store.
    #[must_use]
    pub fn invocation_count(&self, operation_id: &OperationId) -> usize {
        self.read().invocations.get(operation_id).copied().unwrap_or(0)
    }

    /// Returns correlated calls in the order they reached the store.
    #[must_use]
    pub fn invocation_log(&self) -> Vec<OperationId> {
        self.read().invocation_log.clone()
    }

    /// Returns the highest number of simultaneous calls seen for a session.
    #[must_use]
    pub fn max_concurrent_calls(&self, session_id: &SessionId) -> usize {
        self.read().max_in_flight.get(session_id).copied().unwrap_or(0)
    }

    /// Returns the number of stored memories.
    #[must_use]
    pub fn memory_count(&self) -> usize {
        self.read().memories.len()
    }

    /// Returns the number of health checks served.
    #[must_use]
    pub fn health_check_count(&self) -> usize {
        self.read().health_checks
    }

    /// Registers the start of a data call.
    ///
    /// The returned guard keeps the call counted as in flight until it is
    /// dropped, including when the caller abandons the call at a deadline.
    fn begin_call(
        &self,
        correlation_id: Option<&OperationId>,
        session_id: Option<&SessionId>,
    ) -> MemoryStoreResult<InFlightCall<'_>> {
        let mut state = self.write();
        if let Some(operation_id) = correlation_id {
            *state.invocations.entry(operation_id.clone()).or_insert(0) += 1;
            state.invocation_log.push(operation_id.clone());
        }
        if let Some(error) = state.scripted_failures.pop_front() {
            return Err(error);
        }
        if let Some(session) = session_id {
            let current = {
                let counter = state.in_flight.entry(session.clone()).or_insert(0);
                *counter += 1;
                *counter
            };
            let peak = state.max_in_flight.entry(session.clone()).or_insert(0);
            *peak = (*peak).max(current);
        }
        Ok(InFlightCall {
            store: self,
            session_id: session_id.cloned(),
            latency: state.latency,
        })
    }

    async fn simulate_latency(latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

/// A data call that has reached the store and not yet finished.
struct InFlightCall<'a> {
    store: &'a InMemoryMemoryStore,
    session_id: Option<SessionId>,
    latency: Duration,
}

impl Drop for InFlightCall<'_> {
    fn drop(&mut self) {
        if let Some(session) = &self.session_id {
            let mut state = self.store.write();
            if let Some(counter) = state.in_flight.get_mut(session) {
                *counter = counter.saturating_sub(1);
            }
        }
    }
}

/// Scores a memory by the number of query terms its content contains.
fn term_score(content: &str, terms: &[String]) -> usize {
    let haystack = content.to_lowercase();
    terms.iter().filter(|term| haystack.contains(term.as_str())).count()
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn add_memory(&self, request: AddMemoryRequest) -> MemoryStoreResult<Value> {
        let call = self.begin_call(request.correlation_id.as_ref(), request.session_id.as_ref())?;
        Self::simulate_latency(call.latency).await;

        let memory = StoredMemory {
            id: format!("mem-{}", Uuid::new_v4().simple()),
            content: request.content,
            user_id: request.user_id,
            agent_id: request.agent_id,
            session_id: request.session_id,
            metadata: request.metadata,
        };
        let response = json!({
            "id": memory.id,
            "memory": memory.content,
            "event": "ADD",
        });
        self.write().memories.push(memory);
        drop(call);
        Ok(response)
    }

    async fn search_memory(&self, request: SearchMemoryRequest) -> MemoryStoreResult<Value> {
        let call = self.begin_call(request.correlation_id.as_ref(), request.session_id.as_ref())?;
        Self::simulate_latency(call.latency).await;

        let terms: Vec<String> = request
            .query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let entity = request.entity.as_deref().map(str::to_lowercase);
        let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);

        let results: Vec<Value> = {
            let state = self.read();
            let mut scored: Vec<(usize, usize, &StoredMemory)> = state
                .memories
                .iter()
                .enumerate()
                .filter(|(_, memory)| memory.visible_to(&request.user_id, request.agent_id.as_ref()))
                .filter(|(_, memory)| {
                    entity
                        .as_deref()
                        .is_none_or(|name| memory.content.to_lowercase().contains(name))
                })
                .map(|(position, memory)| (term_score(&memory.content, &terms), position, memory))
                .filter(|(score, _, _)| *score > 0)
                .collect();
            scored.sort_by(|left, right| right.0.cmp(&left.0).then(left.1.cmp(&right.1)));
            scored
                .into_iter()
                .take(limit)
                .map(|(score, _, memory)| memory.to_json(Some(score)))
                .collect()
        };

        drop(call);
        Ok(json!({ "results": results }))
    }

    async fn list_memories(&self, request: ListMemoriesRequest) -> MemoryStoreResult<Value> {
        let call = self.begin_call(None, None)?;
        Self::simulate_latency(call.latency).await;
        drop(call);

        let limit = request
            .limit
            .and_then(|raw| usize::try_from(raw).ok())
            .unwrap_or(usize::MAX);
        let state = self.read();
        let results: Vec<Value> = state
            .memories
            .iter()
            .filter(|memory| memory.visible_to(&request.user_id, request.agent_id.as_ref()))
            .take(limit)
            .map(|memory| memory.to_json(None))
            .collect();
        Ok(json!({ "results": results }))
    }

    async fn health_check(&self) -> MemoryStoreResult<StoreHealthReport> {
        let (outcome, latency, memories) = {
            let mut state = self.write();
            state.health_checks += 1;
            (state.health.clone(), state.health_latency, state.memories.len())
        };
        Self::simulate_latency(latency).await;

        outcome.unwrap_or_else(|| {
            Ok(StoreHealthReport::new(
                "healthy",
                json!({ "backend": "in_memory", "memories": memories }),
            ))
        })
    }
}
