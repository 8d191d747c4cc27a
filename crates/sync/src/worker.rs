//! Background worker for periodic reconciliation.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;

use crate::app::{Pantry, SyncSummary};
use crate::offline::{ConnectivityState, HealthCheck};
use crate::types::ReconcileReport;

/// Longest wait between passes while the remote store keeps failing.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Something a UI may want to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SyncEvent {
    Connectivity(ConnectivityState),
    Report(ReconcileReport),
}

/// What one worker iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// The health check failed; nothing was sent.
    Offline,
    Synced(SyncSummary),
}

/// Delay before the next pass after `failures` consecutive failing passes.
pub fn backoff_delay(interval: Duration, failures: u32) -> Duration {
    if failures == 0 {
        return interval;
    }
    let grown = interval.saturating_mul(1 << failures.min(5));
    std::cmp::min(grown, MAX_BACKOFF.max(interval))
}

/// Periodically checks the API and reconciles both collections.
pub struct SyncWorker {
    pantry: Arc<Pantry>,
    health: Arc<dyn HealthCheck>,
    interval: Duration,
    shutdown: Arc<Notify>,
    events: broadcast::Sender<SyncEvent>,
}

/// Handle to a running [`SyncWorker`].
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Ask the worker to stop and wait until it has.
    pub async fn stop(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            tracing::error!("Background sync worker ended abnormally: {}", e);
        }
    }
}

impl SyncWorker {
    pub fn new(pantry: Arc<Pantry>, health: Arc<dyn HealthCheck>, interval: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            pantry,
            health,
            interval,
            shutdown: Arc::new(Notify::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Check connectivity and, when reachable, run one pass over both collections.
    pub async fn tick(&self) -> Tick {
        let offline = self.pantry.offline();
        let before = offline.state();

        if self.health.check_connectivity().await {
            offline.set_online();
        } else {
            offline.set_offline();
        }

        let after = offline.state();
        if after != before {
            let _ = self.events.send(SyncEvent::Connectivity(after));
        }
        if after == ConnectivityState::Offline {
            tracing::debug!("Skipping sync - no connectivity");
            return Tick::Offline;
        }

        let summary = self.pantry.sync_now().await;
        for report in summary.reports() {
            if !report.outcomes.is_empty() || report.partial {
                let _ = self.events.send(SyncEvent::Report(report.clone()));
            }
        }
        Tick::Synced(summary)
    }

    /// Spawn the worker loop.
    ///
    /// The first pass runs immediately. After that the worker waits for the
    /// interval (or the backoff delay while passes keep failing); a local edit
    /// wakes it early unless it is backing off.
    pub fn start(self) -> WorkerHandle {
        let shutdown = self.shutdown.clone();

        let task = tokio::spawn(async move {
            tracing::info!("Background sync worker started");
            let mut consecutive_failures = 0u32;

            loop {
                match self.tick().await {
                    Tick::Synced(summary) if summary.retrying() > 0 => {
                        consecutive_failures += 1;
                        tracing::warn!(
                            "Sync pass left {} records queued (failure count: {})",
                            summary.retrying(),
                            consecutive_failures
                        );
                    }
                    Tick::Synced(_) => consecutive_failures = 0,
                    Tick::Offline => {}
                }

                let delay = backoff_delay(self.interval, consecutive_failures);
                if consecutive_failures > 0 {
                    tracing::debug!("Applying backoff of {:?} before next sync attempt", delay);
                }

                tokio::select! {
                    _ = self.shutdown.notified() => {
                        tracing::info!("Background sync worker received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.pantry.changed(), if consecutive_failures == 0 => {
                        tracing::debug!("Local change detected; syncing early");
                    }
                }
            }

            tracing::info!("Background sync worker stopped");
        });

        WorkerHandle { shutdown, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::OfflineMode;
    use crate::remote::{InMemoryRemoteStore, RemoteError};
    use crate::store::InMemoryLocalStore;
    use crate::types::Outcome;
    use async_trait::async_trait;
    use pantry_core::{InventoryItem, Purchase, Unit};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeHealth(AtomicBool);

    #[async_trait]
    impl HealthCheck for FakeHealth {
        async fn check_connectivity(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct Fixture {
        remote: Arc<InMemoryRemoteStore<InventoryItem>>,
        health: Arc<FakeHealth>,
        pantry: Arc<Pantry>,
    }

    async fn fixture() -> Fixture {
        let remote = InMemoryRemoteStore::<InventoryItem>::arc();
        let pantry = Pantry::with_parts(
            remote.clone(),
            InMemoryRemoteStore::<Purchase>::arc(),
            Arc::new(InMemoryLocalStore::new()),
            OfflineMode::new(),
        )
        .await
        .unwrap();
        Fixture {
            remote,
            health: Arc::new(FakeHealth(AtomicBool::new(true))),
            pantry: Arc::new(pantry),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let interval = Duration::from_secs(30);
        assert_eq!(backoff_delay(interval, 0), interval);
        assert_eq!(backoff_delay(interval, 1), Duration::from_secs(60));
        assert_eq!(backoff_delay(interval, 2), Duration::from_secs(120));
        assert_eq!(backoff_delay(interval, 4), MAX_BACKOFF);
        assert_eq!(backoff_delay(interval, 40), MAX_BACKOFF);
        assert_eq!(backoff_delay(Duration::from_secs(1), 3), Duration::from_secs(8));
    }

    #[test]
    fn huge_intervals_do_not_overflow() {
        let huge = Duration::from_secs(u64::MAX / 4);
        assert_eq!(backoff_delay(huge, 3), huge);
        assert_eq!(backoff_delay(Duration::MAX, 40), Duration::MAX);
    }

    #[tokio::test]
    async fn failed_health_check_marks_offline_without_remote_calls() {
        let f = fixture().await;
        f.health.0.store(false, Ordering::SeqCst);
        f.pantry
            .add_item(InventoryItem::new("Milk", 1.0, Unit::Litre))
            .await
            .unwrap();
        let worker = SyncWorker::new(f.pantry.clone(), f.health.clone(), Duration::from_secs(30));
        let mut events = worker.subscribe();

        assert_eq!(worker.tick().await, Tick::Offline);

        assert!(f.pantry.offline().is_offline());
        assert!(f.remote.calls().is_empty());
        assert_eq!(
            events.try_recv().unwrap(),
            SyncEvent::Connectivity(ConnectivityState::Offline)
        );
    }

    #[tokio::test]
    async fn tick_reconciles_and_publishes_reports() {
        let f = fixture().await;
        f.pantry.offline().set_offline();
        let milk = f
            .pantry
            .add_item(InventoryItem::new("Milk", 1.0, Unit::Litre))
            .await
            .unwrap();
        let worker = SyncWorker::new(f.pantry.clone(), f.health.clone(), Duration::from_secs(30));
        let mut events = worker.subscribe();

        let Tick::Synced(summary) = worker.tick().await else {
            panic!("expected a sync pass");
        };
        assert!(summary.is_clean());

        assert_eq!(
            events.try_recv().unwrap(),
            SyncEvent::Connectivity(ConnectivityState::Online)
        );
        match events.try_recv().unwrap() {
            SyncEvent::Report(report) => {
                assert_eq!(report.collection, "inventory");
                assert_eq!(report.outcome_for(milk.local_id()), Some(&Outcome::Confirmed));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn transient_failures_are_reported_as_retrying() {
        let f = fixture().await;
        f.pantry
            .add_item(InventoryItem::new("Milk", 1.0, Unit::Litre))
            .await
            .unwrap();
        f.remote.fail_next(RemoteError::Api(503, "unavailable".into()));
        let worker = SyncWorker::new(f.pantry.clone(), f.health.clone(), Duration::from_secs(30));

        let Tick::Synced(summary) = worker.tick().await else {
            panic!("expected a sync pass");
        };
        assert_eq!(summary.retrying(), 1);
        assert_eq!(f.pantry.status().await.pending_items, 1);
    }

    #[tokio::test]
    async fn running_worker_syncs_local_edits_and_stops() {
        let f = fixture().await;
        let worker = SyncWorker::new(f.pantry.clone(), f.health.clone(), Duration::from_secs(3600));
        let mut events = worker.subscribe();
        let handle = worker.start();

        f.pantry
            .add_item(InventoryItem::new("Bread", 1.0, Unit::Pieces))
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("worker should react to the local edit")
            .unwrap();
        assert!(matches!(event, SyncEvent::Report(_)));
        assert_eq!(f.remote.len(), 1);

        tokio::time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .expect("worker should stop promptly");
    }
}
