//! Health monitoring as seen through the orchestrator.

use super::helpers::{TestContext, request, session, test_config, user, wait_for_operations};
use mnemo::activity::domain::StoreHealthReport;
use mnemo::activity::ports::MemoryStoreError;
use mnemo::health::domain::HealthStatus;
use serde_json::json;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn health_is_unknown_until_the_first_check() {
    let context = TestContext::with_config(test_config());

    let summary = context.orchestrator.get_health_status();

    assert_eq!(summary.status, HealthStatus::Unknown);
    assert_eq!(summary.checks_performed, 0);
    assert!(summary.last_checked_at.is_none());
    assert!(context.orchestrator.get_health_history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failing_store_is_reported_and_retried_without_blocking_queries() {
    let context = TestContext::with_config(test_config());
    context
        .store
        .set_health(Err(MemoryStoreError::Connection("refused".to_owned())));
    context.orchestrator.start().await.expect("start should succeed");

    tokio::time::sleep(Duration::from_secs(25)).await;

    let summary = context.orchestrator.get_health_status();
    assert_eq!(summary.status, HealthStatus::Unhealthy);
    assert!(summary.checks_performed >= 3);
    assert_eq!(u64::from(summary.consecutive_failures), summary.checks_performed);
    let latest = context
        .orchestrator
        .get_health_history()
        .last()
        .cloned()
        .expect("history has entries");
    assert_eq!(latest.status(), HealthStatus::Unhealthy);
    assert!(latest.detail().get("error").is_some());

    context.store.set_health(Ok(StoreHealthReport::healthy()));
    tokio::time::sleep(Duration::from_secs(10)).await;

    let recovered = context.orchestrator.get_health_status();
    assert_eq!(recovered.status, HealthStatus::Healthy);
    assert_eq!(recovered.consecutive_failures, 0);
    context.orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn history_keeps_only_the_most_recent_checks() {
    let context = TestContext::with_config(test_config());
    context
        .store
        .set_health(Err(MemoryStoreError::Timeout("slow".to_owned())));
    context.orchestrator.start().await.expect("start should succeed");

    tokio::time::sleep(Duration::from_secs(300)).await;

    assert!(context.orchestrator.get_health_status().checks_performed > 20);
    assert_eq!(context.orchestrator.get_health_history().len(), 20);
    context.orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn partial_report_degrades_without_failing_operations() {
    let context = TestContext::with_config(test_config());
    context
        .store
        .set_health(Ok(StoreHealthReport::new("partial", json!({"vector_index": "rebuilding"}))));
    context.orchestrator.start().await.expect("start should succeed");
    tokio::time::sleep(Duration::from_secs(1)).await;

    let alice = user("alice");
    let session_id = session("session-degraded");
    context
        .orchestrator
        .submit_operation(&session_id, request("save", "still works", &alice))
        .await
        .expect("operation should be accepted");
    let state = wait_for_operations(&context.orchestrator, &session_id, 1).await;

    assert_eq!(context.orchestrator.get_health_status().status, HealthStatus::Degraded);
    assert!(state.history().latest().is_some_and(|result| result.success()));
    context.orchestrator.shutdown().await;
}
