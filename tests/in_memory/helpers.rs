//! Shared fixtures for in-memory orchestrator integration tests.

use mnemo::activity::adapters::InMemoryMemoryStore;
use mnemo::activity::domain::ActivityOptions;
use mnemo::config::OrchestratorConfig;
use mnemo::health::domain::HealthMonitorConfig;
use mnemo::operation::{
    OperationId, OperationKind, OperationPayload, OperationRequest, SessionId, UserId,
};
use mnemo::orchestrator::MemoryOrchestrator;
use mnemo::session::adapters::InMemorySessionJournal;
use mnemo::session::domain::{SessionPhase, SessionState};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use std::time::Duration;

/// Orchestrator wired to in-memory adapters.
pub type TestOrchestrator =
    MemoryOrchestrator<InMemoryMemoryStore, InMemorySessionJournal, DefaultClock>;

/// Longest a test waits for asynchronous session progress.
const WAIT_LIMIT: Duration = Duration::from_secs(300);

/// Store, journal and an orchestrator built on them.
pub struct TestContext {
    /// Shared memory store.
    pub store: Arc<InMemoryMemoryStore>,
    /// Shared session journal.
    pub journal: Arc<InMemorySessionJournal>,
    /// Configuration used for every orchestrator built from this context.
    pub config: OrchestratorConfig,
    /// Orchestrator under test.
    pub orchestrator: TestOrchestrator,
}

impl TestContext {
    /// Builds a context with `config`.
    #[must_use]
    pub fn with_config(config: OrchestratorConfig) -> Self {
        let store = Arc::new(InMemoryMemoryStore::new());
        let journal = Arc::new(InMemorySessionJournal::new());
        let orchestrator = MemoryOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&journal),
            Arc::new(DefaultClock),
            config,
        );
        Self {
            store,
            journal,
            config,
            orchestrator,
        }
    }

    /// Builds a second orchestrator over the same store and journal, as a
    /// restarted process would.
    #[must_use]
    pub fn restarted(&self) -> TestOrchestrator {
        MemoryOrchestrator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.journal),
            Arc::new(DefaultClock),
            self.config,
        )
    }
}

/// Configuration with short retry delays for fast tests.
#[must_use]
pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_activity(
            ActivityOptions::default()
                .with_timeout(Duration::from_secs(5))
                .with_backoff(Duration::from_millis(10), Duration::from_millis(50)),
        )
        .with_health(
            HealthMonitorConfig::default()
                .with_interval(Duration::from_secs(120))
                .with_retry_delay(Duration::from_secs(10))
                .with_check_timeout(Duration::from_secs(5)),
        )
}

/// Provides a fresh context for each test.
#[fixture]
pub fn context() -> TestContext {
    TestContext::with_config(test_config())
}

/// Builds a user id.
///
/// # Panics
///
/// Panics when `name` is not a valid identifier.
#[must_use]
pub fn user(name: &str) -> UserId {
    UserId::new(name).expect("valid user id")
}

/// Builds a session id.
///
/// # Panics
///
/// Panics when `name` is not a valid identifier.
#[must_use]
pub fn session(name: &str) -> SessionId {
    SessionId::new(name).expect("valid session id")
}

/// Builds an operation id.
///
/// # Panics
///
/// Panics when `name` is not a valid identifier.
#[must_use]
pub fn operation_id(name: &str) -> OperationId {
    OperationId::new(name).expect("valid operation id")
}

/// Builds a request of `kind` carrying `text`.
#[must_use]
pub fn request(kind: &str, text: &str, user_id: &UserId) -> OperationRequest {
    OperationRequest::new(
        OperationKind::parse(kind),
        user_id.clone(),
        OperationPayload::new(text),
    )
}

/// Waits until the session has completed at least `count` operations and
/// returns that state.
///
/// # Panics
///
/// Panics when the session is unknown, terminates first, or does not get
/// there in time.
pub async fn wait_for_operations(
    orchestrator: &TestOrchestrator,
    session_id: &SessionId,
    count: u64,
) -> SessionState {
    let mut states = orchestrator
        .watch_session(session_id)
        .expect("session should be live");
    let waited = tokio::time::timeout(
        WAIT_LIMIT,
        states.wait_for(|state| {
            state.operations_count() >= count || state.phase() == SessionPhase::Terminated
        }),
    )
    .await
    .expect("session should make progress in time")
    .expect("session should keep publishing")
    .clone();
    assert!(
        waited.operations_count() >= count,
        "session terminated after {} operations",
        waited.operations_count()
    );
    waited
}

/// Waits until the session terminates and returns its final state.
///
/// # Panics
///
/// Panics when the session is unknown or does not terminate in time.
pub async fn wait_for_termination(
    orchestrator: &TestOrchestrator,
    session_id: &SessionId,
) -> SessionState {
    let mut states = orchestrator
        .watch_session(session_id)
        .expect("session should be live");
    tokio::time::timeout(
        WAIT_LIMIT,
        states.wait_for(|state| state.phase() == SessionPhase::Terminated),
    )
    .await
    .expect("session should terminate in time")
    .expect("session should publish its termination")
    .clone()
}
