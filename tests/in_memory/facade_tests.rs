//! Session resolution, batches and memory listing through the façade.

use super::helpers::{
    TestContext, context, request, session, test_config, user, wait_for_operations,
};
use mnemo::activity::ports::MemoryStoreError;
use mnemo::operation::{OperationId, OperationKind, OperationPayload, SessionId};
use mnemo::orchestrator::{OrchestratorError, SessionIdPolicy};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deterministic_policy_reuses_the_user_session(context: TestContext) {
    let alice = user("alice");

    let first = context
        .orchestrator
        .create_or_get_session(&alice, None)
        .await
        .expect("session should start");
    let second = context
        .orchestrator
        .create_or_get_session(&alice, None)
        .await
        .expect("session should be reused");

    assert_eq!(first.as_str(), "auto-session-alice");
    assert_eq!(first, second);
    assert_eq!(context.orchestrator.active_session_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn always_create_policy_opens_a_session_per_call() {
    let context = TestContext::with_config(
        test_config().with_session_id_policy(SessionIdPolicy::AlwaysCreate),
    );
    let alice = user("alice");

    let first = context
        .orchestrator
        .create_or_get_session(&alice, None)
        .await
        .expect("session should start");
    let second = context
        .orchestrator
        .create_or_get_session(&alice, None)
        .await
        .expect("session should start");

    assert_ne!(first, second);
    assert!(first.as_str().starts_with("session-alice-"));
    assert_eq!(context.orchestrator.active_session_count(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_session_id_wins_over_the_policy(context: TestContext) {
    let alice = user("alice");
    let chosen = session("chosen-session");

    let resolved = context
        .orchestrator
        .resolve_session(&alice, None, Some(&chosen))
        .await
        .expect("session should start");

    assert_eq!(resolved, chosen);
    assert!(context.orchestrator.get_session_state(&chosen).is_ok());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn batch_runs_in_submission_order(context: TestContext) {
    let alice = user("alice");
    let session_id = session("session-batch");
    let items = vec![
        (OperationKind::parse("save"), OperationPayload::new("first")),
        (OperationKind::parse("save"), OperationPayload::new("second")),
        (OperationKind::parse("search"), OperationPayload::new("first second")),
    ];

    let ids = context
        .orchestrator
        .submit_batch(&session_id, &alice, None, items)
        .await
        .expect("batch should be accepted");
    let state = wait_for_operations(&context.orchestrator, &session_id, 3).await;

    let completed: Vec<OperationId> = state
        .history()
        .iter()
        .map(|result| result.operation_id().clone())
        .collect();
    assert_eq!(completed, ids);
    let search = state.history().latest().and_then(|result| result.result());
    let hits = search
        .and_then(|value| value.get("results"))
        .and_then(|results| results.as_array())
        .map_or(0, Vec::len);
    assert_eq!(hits, 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_batch_accepts_nothing(context: TestContext) {
    let ids = context
        .orchestrator
        .submit_batch(&session("session-empty"), &user("alice"), None, Vec::new())
        .await
        .expect("empty batch is a no-op");

    assert!(ids.is_empty());
    assert_eq!(context.orchestrator.active_session_count(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn memories_are_listed_per_user(context: TestContext) {
    let alice = user("alice");
    let bob = user("bob");
    for (owner, text) in [(&alice, "alice one"), (&alice, "alice two"), (&bob, "bob one")] {
        let session_id = SessionId::auto_for(owner);
        context
            .orchestrator
            .submit_operation(&session_id, request("save", text, owner))
            .await
            .expect("operation should be accepted");
    }
    wait_for_operations(&context.orchestrator, &SessionId::auto_for(&alice), 2).await;
    wait_for_operations(&context.orchestrator, &SessionId::auto_for(&bob), 1).await;

    let all = context
        .orchestrator
        .list_memories(&alice, None, None)
        .await
        .expect("listing should succeed");
    let limited = context
        .orchestrator
        .list_memories(&alice, None, Some(1))
        .await
        .expect("listing should succeed");

    let count = |value: &serde_json::Value| {
        value
            .get("results")
            .and_then(|results| results.as_array())
            .map_or(0, Vec::len)
    };
    assert_eq!(count(&all), 2);
    assert_eq!(count(&limited), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_listing_surfaces_as_store_error(context: TestContext) {
    context
        .store
        .fail_next(MemoryStoreError::Rejected("bad filter".to_owned()));

    let outcome = context
        .orchestrator
        .list_memories(&user("alice"), None, None)
        .await;

    assert!(matches!(outcome, Err(OrchestratorError::MemoryStore(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn offline_journal_makes_the_engine_unavailable(context: TestContext) {
    context.journal.set_offline(true).expect("toggle journal");

    let outcome = context
        .orchestrator
        .submit_operation(&session("session-offline"), request("save", "hello", &user("alice")))
        .await;

    assert!(matches!(outcome, Err(OrchestratorError::EngineUnavailable(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_session_is_not_found(context: TestContext) {
    let missing = session("session-missing");

    assert!(matches!(
        context.orchestrator.get_session_state(&missing),
        Err(OrchestratorError::SessionNotFound(_))
    ));
    assert!(matches!(
        context.orchestrator.close_session(&missing).await,
        Err(OrchestratorError::SessionNotFound(_))
    ));
}

#[test]
fn invalid_identifiers_become_orchestrator_errors() {
    let outcome: Result<SessionId, OrchestratorError> =
        SessionId::new("").map_err(OrchestratorError::from);

    assert!(matches!(outcome, Err(OrchestratorError::InvalidIdentifier(_))));
}
