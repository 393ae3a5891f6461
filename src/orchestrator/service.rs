//! The orchestration façade.

use super::{OrchestratorError, SessionIdPolicy};
use crate::activity::{
    domain::ListMemoriesRequest, ports::MemoryStore, services::ActivityExecutor,
};
use crate::config::OrchestratorConfig;
use crate::health::{
    domain::{HealthRecord, HealthSummary},
    services::HealthMonitor,
};
use crate::operation::{
    AgentId, Operation, OperationId, OperationKind, OperationPayload, OperationRequest, SessionId,
    UserId,
};
use crate::session::{
    domain::{CloseReason, SessionPhase, SessionState},
    ports::SessionJournal,
    services::{SessionError, SessionHandle, SessionRegistry},
};
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Entry point for submitting memory operations and querying health.
///
/// Construct one per process, call [`MemoryOrchestrator::start`] once, and
/// call [`MemoryOrchestrator::shutdown`] before exit to drain sessions.
pub struct MemoryOrchestrator<S, J, C>
where
    S: MemoryStore + 'static,
    J: SessionJournal + 'static,
    C: Clock + Send + Sync + 'static,
{
    registry: SessionRegistry<S, J, C>,
    monitor: HealthMonitor<S, C>,
    executor: ActivityExecutor<S, C>,
    clock: Arc<C>,
    policy: SessionIdPolicy,
}

impl<S, J, C> MemoryOrchestrator<S, J, C>
where
    S: MemoryStore + 'static,
    J: SessionJournal + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Wires the orchestrator around a memory store and a session journal.
    #[must_use]
    pub fn new(store: Arc<S>, journal: Arc<J>, clock: Arc<C>, config: OrchestratorConfig) -> Self {
        let executor = ActivityExecutor::new(Arc::clone(&store), Arc::clone(&clock), config.activity);
        let registry = SessionRegistry::new(
            executor.clone(),
            journal,
            Arc::clone(&clock),
            config.session,
        );
        let monitor = HealthMonitor::new(store, Arc::clone(&clock), config.health);
        Self {
            registry,
            monitor,
            executor,
            clock,
            policy: config.session_id_policy,
        }
    }

    /// Recovers journaled sessions and starts the health monitor.
    ///
    /// Returns the number of resumed sessions.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::EngineUnavailable`] when the journal
    /// cannot be read; the monitor is not started in that case.
    pub async fn start(&self) -> Result<usize, OrchestratorError> {
        let resumed = self.registry.recover().await?;
        self.monitor.start();
        info!(resumed, policy = %self.policy, "memory orchestrator started");
        Ok(resumed)
    }

    /// Returns the session id policy.
    #[must_use]
    pub const fn session_id_policy(&self) -> SessionIdPolicy {
        self.policy
    }

    /// Returns a live session for `user_id`, chosen by the session id
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::EngineUnavailable`] when the session
    /// start cannot be persisted.
    pub async fn create_or_get_session(
        &self,
        user_id: &UserId,
        agent_id: Option<&AgentId>,
    ) -> Result<SessionId, OrchestratorError> {
        self.resolve_session(user_id, agent_id, None).await
    }

    /// Returns `session_id` when given, otherwise the policy's choice, and
    /// makes sure a live session exists for it.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::EngineUnavailable`] when the session
    /// start cannot be persisted.
    pub async fn resolve_session(
        &self,
        user_id: &UserId,
        agent_id: Option<&AgentId>,
        session_id: Option<&SessionId>,
    ) -> Result<SessionId, OrchestratorError> {
        let resolved = session_id
            .cloned()
            .unwrap_or_else(|| self.policy.session_id_for(user_id));
        self.registry
            .get_or_create(&resolved, user_id, agent_id)
            .await?;
        Ok(resolved)
    }

    /// Accepts an operation into `session_id` and returns its id without
    /// waiting for execution.
    ///
    /// The session is created when absent. Re-submitting an operation id
    /// the session already accepted returns the same id and runs nothing.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::EngineUnavailable`] when acceptance
    /// cannot be persisted.
    pub async fn submit_operation(
        &self,
        session_id: &SessionId,
        request: OperationRequest,
    ) -> Result<OperationId, OrchestratorError> {
        let operation_id = request
            .operation_id
            .clone()
            .unwrap_or_else(OperationId::generate);
        let request = request.with_operation_id(operation_id.clone());

        loop {
            let handle = self
                .registry
                .get_or_create(session_id, &request.user_id, request.agent_id.as_ref())
                .await?;
            let operation = Operation::accept(request.clone(), session_id.clone(), self.clock.as_ref());
            let operation_type = operation.operation_type().clone();

            match handle.submit(operation).await {
                Ok(queued) => {
                    info!(
                        session_id = %session_id,
                        operation_id = %operation_id,
                        operation_type = %operation_type,
                        queued,
                        "operation accepted"
                    );
                    return Ok(operation_id);
                }
                Err(SessionError::Closed(_)) => handle.terminated().await,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Accepts several operations into `session_id` in order, with no other
    /// submission interleaved. Returns their ids in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::EngineUnavailable`] when acceptance
    /// cannot be persisted; operations accepted before the failure stay
    /// queued.
    pub async fn submit_batch(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        agent_id: Option<&AgentId>,
        items: Vec<(OperationKind, OperationPayload)>,
    ) -> Result<Vec<OperationId>, OrchestratorError> {
        let requests: Vec<OperationRequest> = items
            .into_iter()
            .map(|(kind, payload)| {
                OperationRequest::new(kind, user_id.clone(), payload)
                    .with_agent(agent_id.cloned())
                    .with_operation_id(OperationId::generate())
            })
            .collect();
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        loop {
            let handle = self
                .registry
                .get_or_create(session_id, user_id, agent_id)
                .await?;
            let operations: Vec<Operation> = requests
                .iter()
                .map(|request| Operation::accept(request.clone(), session_id.clone(), self.clock.as_ref()))
                .collect();
            let operation_ids: Vec<OperationId> = operations
                .iter()
                .map(|operation| operation.operation_id().clone())
                .collect();

            match handle.submit_all(operations).await {
                Ok(_) => {
                    info!(session_id = %session_id, count = operation_ids.len(), "operation batch accepted");
                    return Ok(operation_ids);
                }
                Err(SessionError::Closed(_)) => handle.terminated().await,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Returns the latest state of a live session.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::SessionNotFound`] when no live session
    /// has this id.
    pub fn get_session_state(&self, session_id: &SessionId) -> Result<SessionState, OrchestratorError> {
        let state = self.live_handle(session_id)?.state();
        if state.phase() == SessionPhase::Terminated {
            return Err(OrchestratorError::SessionNotFound(session_id.clone()));
        }
        Ok(state)
    }

    /// Returns a receiver that observes every state the session publishes,
    /// up to and including termination.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::SessionNotFound`] when no live session
    /// has this id.
    pub fn watch_session(
        &self,
        session_id: &SessionId,
    ) -> Result<watch::Receiver<SessionState>, OrchestratorError> {
        Ok(self.live_handle(session_id)?.subscribe())
    }

    /// Stops the session accepting operations. Already accepted operations
    /// still run before it terminates.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::SessionNotFound`] when no live session
    /// has this id, or [`OrchestratorError::EngineUnavailable`] when the
    /// close cannot be persisted.
    pub async fn close_session(&self, session_id: &SessionId) -> Result<(), OrchestratorError> {
        let handle = self.live_handle(session_id)?;
        handle.close(CloseReason::Requested, self.clock.utc()).await?;
        info!(session_id = %session_id, "session close requested");
        Ok(())
    }

    /// Returns the health status summary.
    #[must_use]
    pub fn get_health_status(&self) -> HealthSummary {
        self.monitor.status()
    }

    /// Returns retained health records, oldest first.
    #[must_use]
    pub fn get_health_history(&self) -> Vec<HealthRecord> {
        self.monitor.history()
    }

    /// Returns the number of sessions accepting operations.
    #[must_use]
    pub fn active_session_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Lists stored memories for a user under the activity timeout and
    /// retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::MemoryStore`] when the store call fails
    /// after retries.
    pub async fn list_memories(
        &self,
        user_id: &UserId,
        agent_id: Option<&AgentId>,
        limit: Option<u32>,
    ) -> Result<Value, OrchestratorError> {
        let request = ListMemoriesRequest {
            user_id: user_id.clone(),
            agent_id: agent_id.cloned(),
            limit,
        };
        self.executor.list_memories(request).await.map_err(|err| {
            warn!(user_id = %user_id, error = %err, "listing memories failed");
            OrchestratorError::from(err)
        })
    }

    /// Drains every session and stops the health monitor.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
        self.monitor.stop().await;
        info!("memory orchestrator shut down");
    }

    /// Stops every task immediately. Journals are kept, so a new
    /// orchestrator over the same journal resumes where this one stopped.
    pub async fn abort(&self) {
        self.registry.abort_all();
        self.monitor.stop().await;
        warn!("memory orchestrator aborted");
    }

    fn live_handle(&self, session_id: &SessionId) -> Result<SessionHandle<J>, OrchestratorError> {
        self.registry
            .get(session_id)
            .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.clone()))
    }
}
