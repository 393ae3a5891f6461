//! Journal replay after a crash or restart.

use super::helpers::{
    TestContext, context, operation_id, request, session, user, wait_for_operations,
};
use chrono::Utc;
use mnemo::operation::{Operation, OperationResult};
use mnemo::session::domain::{CloseReason, DEFAULT_HISTORY_LIMIT, SessionEvent, SessionPhase};
use mnemo::session::ports::SessionJournal;
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

fn started(session_name: &str, owner: &str) -> SessionEvent {
    SessionEvent::SessionStarted {
        session_id: session(session_name),
        user_id: user(owner),
        agent_id: None,
        history_limit: DEFAULT_HISTORY_LIMIT,
        started_at: Utc::now(),
    }
}

fn accepted(session_name: &str, id: &str, text: &str) -> Operation {
    Operation::accept(
        request("save", text, &user("alice")).with_operation_id(operation_id(id)),
        session(session_name),
        &DefaultClock,
    )
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completed_operation_is_not_repeated_after_restart(context: TestContext) {
    let alice = user("alice");
    let session_id = session("session-crash");
    let fixed = operation_id("op-crash");
    context
        .orchestrator
        .submit_operation(
            &session_id,
            request("save", "before crash", &alice).with_operation_id(fixed.clone()),
        )
        .await
        .expect("operation should be accepted");
    wait_for_operations(&context.orchestrator, &session_id, 1).await;
    context.orchestrator.abort().await;

    let restarted = context.restarted();
    let resumed = restarted.start().await.expect("recovery should succeed");
    assert_eq!(resumed, 1);

    restarted
        .submit_operation(
            &session_id,
            request("save", "before crash", &alice).with_operation_id(fixed.clone()),
        )
        .await
        .expect("duplicate is acknowledged");
    restarted
        .submit_operation(&session_id, request("search", "crash", &alice))
        .await
        .expect("operation should be accepted");

    let state = wait_for_operations(&restarted, &session_id, 2).await;
    assert_eq!(state.operations_count(), 2);
    assert_eq!(context.store.invocation_count(&fixed), 1);
    restarted.shutdown().await;
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn accepted_but_unfinished_operation_runs_on_recovery(context: TestContext) {
    let session_id = session("session-pending");
    let pending = accepted("session-pending", "op-pending", "resume me");
    context
        .journal
        .append(&session_id, &started("session-pending", "alice"))
        .await
        .expect("append start");
    context
        .journal
        .append(&session_id, &SessionEvent::OperationAccepted { operation: pending })
        .await
        .expect("append accepted");

    let resumed = context.orchestrator.start().await.expect("recovery should succeed");
    assert_eq!(resumed, 1);

    let state = wait_for_operations(&context.orchestrator, &session_id, 1).await;
    let result = state.history().latest().expect("one result");
    assert_eq!(result.operation_id(), &operation_id("op-pending"));
    assert!(result.success());
    assert_eq!(context.store.invocation_count(&operation_id("op-pending")), 1);
    assert_eq!(context.store.memory_count(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn journaled_completion_restores_state_without_execution(context: TestContext) {
    let session_id = session("session-done");
    let done = accepted("session-done", "op-done", "already stored");
    let result = OperationResult::succeeded(
        done.operation_id().clone(),
        json!({"id": "mem-1"}),
        Utc::now(),
    );
    for event in [
        started("session-done", "alice"),
        SessionEvent::OperationAccepted { operation: done },
        SessionEvent::OperationCompleted { result },
    ] {
        context.journal.append(&session_id, &event).await.expect("append event");
    }

    let resumed = context.orchestrator.start().await.expect("recovery should succeed");

    assert_eq!(resumed, 1);
    let state = context
        .orchestrator
        .get_session_state(&session_id)
        .expect("recovered session is live");
    assert_eq!(state.operations_count(), 1);
    assert_eq!(state.phase(), SessionPhase::Active);
    assert_eq!(context.store.invocation_count(&operation_id("op-done")), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn terminated_journal_is_purged_instead_of_resumed(context: TestContext) {
    let session_id = session("session-finished");
    for event in [
        started("session-finished", "alice"),
        SessionEvent::SessionTerminated { terminated_at: Utc::now() },
    ] {
        context.journal.append(&session_id, &event).await.expect("append event");
    }

    let resumed = context.orchestrator.start().await.expect("recovery should succeed");

    assert_eq!(resumed, 0);
    assert!(context.journal.events(&session_id).expect("journal readable").is_empty());
    assert_eq!(context.orchestrator.active_session_count(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unreadable_journal_is_skipped(context: TestContext) {
    let listed_under = session("session-mislabelled");
    context
        .journal
        .append(&listed_under, &started("session-other", "alice"))
        .await
        .expect("append event");
    let healthy = session("session-healthy");
    context
        .journal
        .append(&healthy, &started("session-healthy", "bob"))
        .await
        .expect("append event");

    let resumed = context.orchestrator.start().await.expect("recovery should succeed");

    assert_eq!(resumed, 1);
    assert!(context.orchestrator.get_session_state(&healthy).is_ok());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn session_closing_at_crash_finishes_closing_on_recovery(context: TestContext) {
    let session_id = session("session-half-closed");
    for event in [
        started("session-half-closed", "alice"),
        SessionEvent::OperationAccepted {
            operation: accepted("session-half-closed", "op-last", "last words"),
        },
        SessionEvent::CloseRequested {
            reason: CloseReason::Requested,
            requested_at: Utc::now(),
        },
    ] {
        context.journal.append(&session_id, &event).await.expect("append event");
    }
    let resumed = context.orchestrator.start().await.expect("recovery should succeed");
    assert_eq!(resumed, 1);

    // The drain may already have finished and released the session.
    if let Ok(mut states) = context.orchestrator.watch_session(&session_id) {
        let final_state = states
            .wait_for(|state| state.phase() == SessionPhase::Terminated)
            .await
            .expect("termination is published")
            .clone();
        assert_eq!(final_state.operations_count(), 1);
    }
    assert_eq!(context.store.invocation_count(&operation_id("op-last")), 1);
    assert!(context.journal.events(&session_id).expect("journal readable").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn briefly_failing_journal_still_records_the_result(context: TestContext) {
    let alice = user("alice");
    let session_id = session("session-flaky");
    let fixed = operation_id("op-flaky");
    context.store.set_latency(Duration::from_millis(200));
    context
        .orchestrator
        .submit_operation(
            &session_id,
            request("save", "recorded once", &alice).with_operation_id(fixed.clone()),
        )
        .await
        .expect("operation should be accepted");
    context.journal.fail_next_appends(1).expect("journal reachable");

    wait_for_operations(&context.orchestrator, &session_id, 1).await;
    let events = context.journal.events(&session_id).expect("journal readable");
    assert!(events.iter().any(|event| matches!(
        event,
        SessionEvent::OperationCompleted { result } if result.operation_id() == &fixed
    )));
    context.orchestrator.abort().await;

    let restarted = context.restarted();
    restarted.start().await.expect("recovery should succeed");
    restarted
        .submit_operation(
            &session_id,
            request("save", "recorded once", &alice).with_operation_id(fixed.clone()),
        )
        .await
        .expect("duplicate is acknowledged");
    restarted
        .submit_operation(&session_id, request("search", "recorded", &alice))
        .await
        .expect("operation should be accepted");

    wait_for_operations(&restarted, &session_id, 2).await;
    assert_eq!(context.store.invocation_count(&fixed), 1);
    restarted.shutdown().await;
}
