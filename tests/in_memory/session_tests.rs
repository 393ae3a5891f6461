//! Session acceptance, serialisation, history and closing through the façade.

use super::helpers::{
    TestContext, context, operation_id, request, session, user, wait_for_operations,
    wait_for_termination,
};
use mnemo::operation::{OperationErrorKind, OperationId};
use mnemo::orchestrator::OrchestratorError;
use mnemo::session::domain::{SessionEvent, SessionPhase};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn save_to_new_session_records_one_success(context: TestContext) {
    let alice = user("alice");
    let session_id = context
        .orchestrator
        .create_or_get_session(&alice, None)
        .await
        .expect("session should start");

    context
        .orchestrator
        .submit_operation(&session_id, request("SAVE", "hello", &alice))
        .await
        .expect("operation should be accepted");

    let state = wait_for_operations(&context.orchestrator, &session_id, 1).await;
    assert_eq!(state.operations_count(), 1);
    let first = state.history().oldest().expect("one result");
    assert!(first.success());
    assert!(first.result().and_then(|value| value.get("id")).is_some());
    assert_eq!(context.store.memory_count(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn eleventh_search_evicts_the_first_result(context: TestContext) {
    let alice = user("alice");
    let session_id = session("session-history");
    let mut submitted = Vec::new();
    for index in 0..11 {
        let id = context
            .orchestrator
            .submit_operation(&session_id, request("search", &format!("query {index}"), &alice))
            .await
            .expect("operation should be accepted");
        submitted.push(id);
    }

    let state = wait_for_operations(&context.orchestrator, &session_id, 11).await;

    let recorded: Vec<OperationId> = state
        .history()
        .iter()
        .map(|result| result.operation_id().clone())
        .collect();
    assert_eq!(recorded.len(), 10);
    assert_eq!(recorded.as_slice(), submitted.get(1..).expect("eleven ids"));
    assert_eq!(state.operations_count(), 11);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_operation_type_is_recorded_as_validation_failure(context: TestContext) {
    let alice = user("alice");
    let session_id = session("session-unknown");

    let id = context
        .orchestrator
        .submit_operation(&session_id, request("UNKNOWN", "hello", &alice))
        .await
        .expect("unknown types are still accepted");

    let state = wait_for_operations(&context.orchestrator, &session_id, 1).await;
    let result = state.history().latest().expect("one result");
    assert!(!result.success());
    assert_eq!(
        result.error().map(|error| error.kind),
        Some(OperationErrorKind::Validation)
    );
    assert_eq!(state.operations_count(), 1);
    assert_eq!(context.store.invocation_count(&id), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_submissions_never_overlap(context: TestContext) {
    context.store.set_latency(Duration::from_millis(20));
    let context = Arc::new(context);
    let session_id = session("session-serial");
    let alice = user("alice");

    let mut submitters = Vec::new();
    for index in 0..8 {
        let shared = Arc::clone(&context);
        let target = session_id.clone();
        let owner = alice.clone();
        submitters.push(tokio::spawn(async move {
            shared
                .orchestrator
                .submit_operation(&target, request("save", &format!("note {index}"), &owner))
                .await
        }));
    }
    for submitter in submitters {
        submitter
            .await
            .expect("submitter should not panic")
            .expect("operation should be accepted");
    }

    let state = wait_for_operations(&context.orchestrator, &session_id, 8).await;

    assert_eq!(context.store.max_concurrent_calls(&session_id), 1);
    let accepted: Vec<OperationId> = context
        .journal
        .events(&session_id)
        .expect("journal readable")
        .into_iter()
        .filter_map(|event| match event {
            SessionEvent::OperationAccepted { operation } => Some(operation.operation_id().clone()),
            _ => None,
        })
        .collect();
    let completed: Vec<OperationId> = state
        .history()
        .iter()
        .map(|result| result.operation_id().clone())
        .collect();
    assert_eq!(completed, accepted);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sessions_do_not_share_history(context: TestContext) {
    context.store.set_latency(Duration::from_millis(5));
    let context = Arc::new(context);
    let alice = user("alice");
    let bob = user("bob");
    let session_a = session("session-a");
    let session_b = session("session-b");

    let submit_many = |target: mnemo::operation::SessionId, owner: mnemo::operation::UserId| {
        let shared = Arc::clone(&context);
        tokio::spawn(async move {
            let mut ids = Vec::new();
            for index in 0..5 {
                let id = shared
                    .orchestrator
                    .submit_operation(&target, request("save", &format!("{owner} {index}"), &owner))
                    .await
                    .expect("operation should be accepted");
                ids.push(id);
            }
            ids
        })
    };
    let a_task = submit_many(session_a.clone(), alice);
    let b_task = submit_many(session_b.clone(), bob);
    let a_ids = a_task.await.expect("submitter should not panic");
    let b_ids = b_task.await.expect("submitter should not panic");

    let state_a = wait_for_operations(&context.orchestrator, &session_a, 5).await;
    let state_b = wait_for_operations(&context.orchestrator, &session_b, 5).await;

    assert!(state_a.history().iter().all(|result| a_ids.contains(result.operation_id())));
    assert!(state_b.history().iter().all(|result| b_ids.contains(result.operation_id())));
    assert_eq!(context.store.max_concurrent_calls(&session_a), 1);
    assert_eq!(context.store.max_concurrent_calls(&session_b), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resubmitted_operation_id_runs_once(context: TestContext) {
    let alice = user("alice");
    let session_id = session("session-dedupe");
    let fixed = operation_id("op-fixed");

    for _ in 0..2 {
        let id = context
            .orchestrator
            .submit_operation(
                &session_id,
                request("save", "hello", &alice).with_operation_id(fixed.clone()),
            )
            .await
            .expect("operation should be accepted");
        assert_eq!(id, fixed);
    }
    context
        .orchestrator
        .submit_operation(&session_id, request("search", "hello", &alice))
        .await
        .expect("operation should be accepted");

    let state = wait_for_operations(&context.orchestrator, &session_id, 2).await;
    assert_eq!(state.operations_count(), 2);
    assert_eq!(context.store.invocation_count(&fixed), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closing_drains_accepted_operations_then_forgets_the_session(context: TestContext) {
    context.store.set_latency(Duration::from_millis(10));
    let alice = user("alice");
    let session_id = session("session-close");
    for index in 0..3 {
        context
            .orchestrator
            .submit_operation(&session_id, request("save", &format!("note {index}"), &alice))
            .await
            .expect("operation should be accepted");
    }
    let mut states = context
        .orchestrator
        .watch_session(&session_id)
        .expect("session is live");

    context
        .orchestrator
        .close_session(&session_id)
        .await
        .expect("close should be acknowledged");

    let final_state = states
        .wait_for(|state| state.phase() == SessionPhase::Terminated)
        .await
        .expect("termination is published")
        .clone();
    assert_eq!(final_state.operations_count(), 3);
    assert!(!final_state.is_active());
    assert!(matches!(
        context.orchestrator.get_session_state(&session_id),
        Err(OrchestratorError::SessionNotFound(_))
    ));
    assert_eq!(context.orchestrator.active_session_count(), 0);
    assert!(context.journal.events(&session_id).expect("journal readable").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn submitting_after_close_starts_a_fresh_session(context: TestContext) {
    let alice = user("alice");
    let session_id = session("session-reopen");
    context
        .orchestrator
        .submit_operation(&session_id, request("save", "first", &alice))
        .await
        .expect("operation should be accepted");
    wait_for_operations(&context.orchestrator, &session_id, 1).await;

    context
        .orchestrator
        .close_session(&session_id)
        .await
        .expect("close should be acknowledged");
    context
        .orchestrator
        .submit_operation(&session_id, request("save", "second", &alice))
        .await
        .expect("operation should be accepted by a fresh session");

    let state = wait_for_operations(&context.orchestrator, &session_id, 1).await;
    assert_eq!(state.operations_count(), 1);
    assert_eq!(state.phase(), SessionPhase::Active);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn idle_session_expires_after_its_ttl() {
    let config = super::helpers::test_config().with_session(
        mnemo::session::domain::SessionConfig::default().with_ttl(Duration::from_secs(60)),
    );
    let context = TestContext::with_config(config);
    let alice = user("alice");
    let session_id = session("session-idle");
    context
        .orchestrator
        .submit_operation(&session_id, request("save", "hello", &alice))
        .await
        .expect("operation should be accepted");
    wait_for_operations(&context.orchestrator, &session_id, 1).await;
    let idle_from = tokio::time::Instant::now();

    let final_state = wait_for_termination(&context.orchestrator, &session_id).await;

    assert!(idle_from.elapsed() >= Duration::from_secs(59));
    assert_eq!(final_state.phase(), SessionPhase::Terminated);
    assert!(matches!(
        context.orchestrator.get_session_state(&session_id),
        Err(OrchestratorError::SessionNotFound(_))
    ));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn activity_keeps_an_idle_session_alive() {
    let config = super::helpers::test_config().with_session(
        mnemo::session::domain::SessionConfig::default().with_ttl(Duration::from_secs(60)),
    );
    let context = TestContext::with_config(config);
    let alice = user("alice");
    let session_id = session("session-busy");

    for count in 1..=3 {
        context
            .orchestrator
            .submit_operation(&session_id, request("save", "tick", &alice))
            .await
            .expect("operation should be accepted");
        wait_for_operations(&context.orchestrator, &session_id, count).await;
        tokio::time::sleep(Duration::from_secs(45)).await;
    }

    let state = context
        .orchestrator
        .get_session_state(&session_id)
        .expect("session is still live");
    assert_eq!(state.operations_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn submitting_never_waits_for_a_slow_store() {
    let context = TestContext::with_config(super::helpers::test_config());
    context.store.set_latency(Duration::from_secs(4));
    let alice = user("alice");
    let session_id = session("session-slow");
    let started = tokio::time::Instant::now();

    for index in 0..5 {
        context
            .orchestrator
            .submit_operation(&session_id, request("save", &format!("note {index}"), &alice))
            .await
            .expect("operation should be accepted");
    }
    context
        .orchestrator
        .close_session(&session_id)
        .await
        .expect("close should be acknowledged");

    assert!(started.elapsed() < Duration::from_secs(1));
    let final_state = wait_for_termination(&context.orchestrator, &session_id).await;
    assert_eq!(final_state.operations_count(), 5);
}
