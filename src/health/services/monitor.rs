//! Supervised, long-running health check loop.

use crate::activity::ports::MemoryStore;
use crate::health::domain::{
    HealthMonitorConfig, HealthRecord, HealthSnapshot, HealthStatus, HealthSummary,
};
use mockable::Clock;
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct MonitorContext<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    config: HealthMonitorConfig,
    snapshot: watch::Sender<HealthSnapshot>,
    cancel: CancellationToken,
}

/// Periodically checks the memory store and keeps a rolling record window.
///
/// Checks run on a worker task. A supervisor restarts the worker when it
/// panics, so the loop only ends when the monitor is stopped. Queries read
/// the latest snapshot and never wait for a check in flight.
pub struct HealthMonitor<S, C>
where
    S: MemoryStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    context: Arc<MonitorContext<S, C>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl<S, C> HealthMonitor<S, C>
where
    S: MemoryStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a stopped monitor.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>, config: HealthMonitorConfig) -> Self {
        let (snapshot, _) = watch::channel(HealthSnapshot::new(config.window));
        Self {
            context: Arc::new(MonitorContext {
                store,
                clock,
                config,
                snapshot,
                cancel: CancellationToken::new(),
            }),
            supervisor: Mutex::new(None),
        }
    }

    /// Starts the check loop. Returns `false` when it is already running or
    /// the monitor was stopped.
    pub fn start(&self) -> bool {
        let mut supervisor = self.supervisor.lock().unwrap_or_else(PoisonError::into_inner);
        if supervisor.is_some() || self.context.cancel.is_cancelled() {
            return false;
        }
        *supervisor = Some(tokio::spawn(supervise(Arc::clone(&self.context))));
        info!(
            interval = ?self.context.config.interval,
            retry_delay = ?self.context.config.retry_delay,
            "health monitor started"
        );
        true
    }

    /// Returns whether the check loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Returns the latest status summary.
    #[must_use]
    pub fn status(&self) -> HealthSummary {
        self.context.snapshot.borrow().summary().clone()
    }

    /// Returns retained records, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HealthRecord> {
        self.context.snapshot.borrow().history().to_vec()
    }

    /// Returns a receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.context.snapshot.subscribe()
    }

    /// Stops the loop and waits for it to finish.
    pub async fn stop(&self) {
        self.context.cancel.cancel();
        let handle = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(running) = handle
            && let Err(err) = running.await
        {
            warn!(error = %err, "health monitor supervisor ended abnormally");
        }
        info!("health monitor stopped");
    }
}

impl<S, C> Drop for HealthMonitor<S, C>
where
    S: MemoryStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.context.cancel.cancel();
    }
}

async fn supervise<S, C>(context: Arc<MonitorContext<S, C>>)
where
    S: MemoryStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    loop {
        let mut worker = tokio::spawn(run_checks(Arc::clone(&context)));
        let joined = tokio::select! {
            biased;
            () = context.cancel.cancelled() => {
                worker.abort();
                return;
            }
            joined = &mut worker => joined,
        };

        match joined {
            Err(err) if err.is_panic() => {
                error!("health check worker panicked; restarting");
            }
            Ok(()) | Err(_) => return,
        }

        tokio::select! {
            biased;
            () = context.cancel.cancelled() => return,
            () = tokio::time::sleep(context.config.restart_delay) => {}
        }
    }
}

async fn run_checks<S, C>(context: Arc<MonitorContext<S, C>>)
where
    S: MemoryStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    loop {
        let record = check_once(&context).await;
        let delay = if record.status().is_failure() {
            warn!(detail = %record.detail(), "health check failed");
            context.config.retry_delay
        } else {
            debug!(status = %record.status(), "health check completed");
            context.config.interval
        };
        context.snapshot.send_modify(|snapshot| snapshot.record(record));

        tokio::select! {
            biased;
            () = context.cancel.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }
    }
}

async fn check_once<S, C>(context: &MonitorContext<S, C>) -> HealthRecord
where
    S: MemoryStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    let timeout = context.config.check_timeout;
    let outcome = tokio::time::timeout(timeout, context.store.health_check()).await;
    let checked_at = context.clock.utc();

    match outcome {
        Ok(Ok(report)) => match HealthStatus::try_from(report.status.as_str()) {
            Ok(HealthStatus::Unknown) | Err(_) => HealthRecord::new(
                checked_at,
                HealthStatus::Degraded,
                json!({"reported_status": report.status, "detail": report.detail}),
            ),
            Ok(status) => HealthRecord::new(checked_at, status, report.detail),
        },
        Ok(Err(err)) => HealthRecord::new(
            checked_at,
            HealthStatus::Unhealthy,
            json!({"error": err.to_string()}),
        ),
        Err(_) => HealthRecord::new(
            checked_at,
            HealthStatus::Unhealthy,
            json!({"error": format!("health check timed out after {}s", timeout.as_secs())}),
        ),
    }
}
