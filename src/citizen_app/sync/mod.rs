//! # Sync Orchestrator
//!
//! Drains the offline incident queue into the backend.
//!
//! ## Architecture
//!
//! - **Submitter**: injected delivery function (`submitter.rs`)
//! - **Network Monitor**: connectivity state (`network_monitor.rs`)
//! - **Scheduler**: automatic trigger with settle delay (`scheduler.rs`)
//! - **Sync State**: pass reports and UI-facing status (`sync_state.rs`)
//! - **Metrics**: lifetime counters (`metrics.rs`)
//!
//! A pass walks the queue oldest-first, one submission at a time. A failed
//! item is recorded and skipped over; it never aborts the pass. At most one
//! pass runs at a time: a second `sync_now` while one is running returns an
//! idle report immediately.
//!
//! The pass follows the live queue: an item removed or cleared before its
//! turn is not submitted. Stopping automatic sync lets the submission in
//! flight finish and ends the pass before the next item.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use geoinfo::citizen_app::offline::{QueueStore, RetryPolicy};
//! use geoinfo::citizen_app::storage::MemoryStore;
//! use geoinfo::citizen_app::sync::{submit_fn, ConnectivityMonitor, NetworkStatus, SyncOrchestrator};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = Arc::new(QueueStore::initialize(Arc::new(MemoryStore::new())));
//! let monitor = ConnectivityMonitor::new(NetworkStatus::Online);
//! let submitter = Arc::new(submit_fn(|_payload, _photo| async { Ok(()) }));
//! let orchestrator = SyncOrchestrator::new(queue, monitor, submitter, RetryPolicy::unlimited());
//!
//! let report = orchestrator.sync_now().await;
//! assert!(report.success);
//! # }
//! ```

pub mod metrics;
pub mod network_monitor;
pub mod scheduler;
pub mod submitter;
pub mod sync_state;

pub use metrics::SyncMetrics;
pub use network_monitor::{ConnectivityMonitor, NetworkStatus, SignalSubscription};
pub use scheduler::{Settle, SyncScheduler, Trigger, TriggerConditions, DEFAULT_SETTLE_DELAY};
pub use submitter::{submit_fn, FnSubmitter, SubmitError, Submitter};
pub use sync_state::{IdleReason, ItemError, SyncReport, SyncState};

use crate::citizen_app::offline::{QueueStore, RetryPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Shared part of the orchestrator, also owned by the background task
struct SyncInner {
    queue: Arc<QueueStore>,
    monitor: ConnectivityMonitor,
    submitter: Arc<dyn Submitter>,
    policy: RetryPolicy,
    syncing: AtomicBool,
    state: RwLock<SyncState>,
    metrics: RwLock<SyncMetrics>,
}

/// Clears the syncing flag when a pass ends, including by cancellation
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncInner {
    fn try_begin(&self) -> Option<SyncingGuard<'_>> {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SyncingGuard(&self.syncing))
    }

    async fn idle(&self, reason: IdleReason) -> SyncReport {
        tracing::debug!("Sync skipped: {:?}", reason);
        self.metrics.write().await.record_idle();
        SyncReport::idle(reason)
    }

    async fn sync_now(&self, shutdown: Option<&watch::Receiver<bool>>) -> SyncReport {
        if !self.monitor.is_online() {
            return self.idle(IdleReason::Offline).await;
        }
        if self.queue.is_empty().await {
            return self.idle(IdleReason::EmptyQueue).await;
        }
        let Some(_guard) = self.try_begin() else {
            return self.idle(IdleReason::AlreadySyncing).await;
        };

        {
            let mut state = self.state.write().await;
            state.is_syncing = true;
            state.sync_error = None;
        }
        self.metrics.write().await.record_pass_start();

        let ids: Vec<String> = self.queue.list().await.into_iter().map(|item| item.id).collect();
        tracing::info!("Syncing {} queued incident(s)", ids.len());

        let mut report = SyncReport::started();
        for id in ids {
            if shutdown.is_some_and(|stop| *stop.borrow()) {
                tracing::info!("Automatic sync stopped, leaving the rest of the queue");
                break;
            }
            let Some(item) = self.queue.get(&id).await else {
                tracing::debug!("{} left the queue before its turn", id);
                continue;
            };

            if self.policy.is_exhausted(&item) {
                tracing::debug!("Skipping {} after {} failed attempt(s)", item.id, item.attempts);
                report.skipped += 1;
                continue;
            }

            let attachment = match &item.attachment {
                Some(stored) => match stored.decode().await {
                    Ok(attachment) => Some(attachment),
                    Err(e) => {
                        let error = e.to_string();
                        tracing::warn!("Cannot restore photo of {}: {}", item.id, error);
                        self.queue.record_failure(&item.id, error.clone()).await;
                        report.record_failure(&item.id, error);
                        continue;
                    }
                },
                None => None,
            };

            match self.submitter.submit(&item.payload, attachment).await {
                Ok(()) => {
                    self.queue.remove(&item.id).await;
                    report.synced += 1;
                    tracing::debug!("Delivered {}", item.id);
                }
                Err(e) => {
                    let error = e.to_string();
                    tracing::error!("Failed to send incident {}: {}", item.id, error);
                    self.queue.record_failure(&item.id, error.clone()).await;
                    report.record_failure(&item.id, error);
                }
            }
        }

        tracing::info!(
            "Sync pass finished: {} sent, {} failed, {} skipped",
            report.synced,
            report.failed,
            report.skipped
        );

        self.metrics
            .write()
            .await
            .record_pass_end(report.synced, report.failed);
        {
            let mut state = self.state.write().await;
            state.is_syncing = false;
            state.last_sync = Some(chrono::Utc::now());
            state.sync_error = report.error_summary();
            state.last_result = Some(report.clone());
        }

        report
    }

    async fn conditions(&self) -> TriggerConditions {
        TriggerConditions {
            status: self.monitor.current_status(),
            queue_length: self.queue.len().await,
            is_syncing: self.syncing.load(Ordering::SeqCst),
        }
    }

    /// Background loop behind `SyncOrchestrator::start`
    async fn auto_sync_loop(self: Arc<Self>, scheduler: SyncScheduler, mut shutdown: watch::Receiver<bool>) {
        let mut network = self.monitor.subscribe();
        let mut queue_length = self.queue.subscribe();
        let mut last_length = *queue_length.borrow_and_update();
        let _ = network.borrow_and_update();

        let mut trigger = Some(Trigger::Startup);
        loop {
            let Some(current) = trigger.take() else {
                break;
            };

            if self.conditions().await.should_sync() {
                let settled = tokio::select! {
                    _ = stopped(&mut shutdown) => break,
                    settled = scheduler.settle(&mut network) => settled,
                };
                match settled {
                    Settle::Elapsed => {
                        if self.conditions().await.should_sync() {
                            tracing::debug!("Automatic sync after {:?}", current);
                            self.sync_now(Some(&shutdown)).await;
                        }
                    }
                    Settle::WentOffline => tracing::debug!("Went offline before automatic sync"),
                    Settle::Closed => break,
                }
                last_length = *queue_length.borrow_and_update();
            }

            trigger = tokio::select! {
                _ = stopped(&mut shutdown) => break,
                next = scheduler.next_trigger(&mut network, &mut queue_length, &mut last_length) => next,
            };
        }
        tracing::debug!("Automatic sync stopped");
    }
}

/// Resolves once `stop` was requested or the orchestrator is gone
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stop = *shutdown.borrow_and_update();
        if stop || shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Delivers queued incident reports through the injected submitter
pub struct SyncOrchestrator {
    inner: Arc<SyncInner>,
    /// Automatic sync task handle
    background_task: Option<tokio::task::JoinHandle<()>>,
    /// Stop signal of the automatic sync task
    shutdown: Option<watch::Sender<bool>>,
}

impl SyncOrchestrator {
    pub fn new(
        queue: Arc<QueueStore>,
        monitor: ConnectivityMonitor,
        submitter: Arc<dyn Submitter>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                queue,
                monitor,
                submitter,
                policy,
                syncing: AtomicBool::new(false),
                state: RwLock::new(SyncState::default()),
                metrics: RwLock::new(SyncMetrics::new()),
            }),
            background_task: None,
            shutdown: None,
        }
    }

    /// Run one pass now
    pub async fn sync_now(&self) -> SyncReport {
        self.inner.sync_now(None).await
    }

    /// Start syncing automatically on reconnect and on enqueue
    pub fn start(&mut self, settle_delay: Duration) -> Result<(), String> {
        if self.background_task.is_some() {
            return Err("Automatic sync is already running".to_string());
        }

        let inner = Arc::clone(&self.inner);
        let scheduler = SyncScheduler::new(settle_delay);
        let (shutdown, stop_rx) = watch::channel(false);
        self.shutdown = Some(shutdown);
        self.background_task = Some(tokio::spawn(inner.auto_sync_loop(scheduler, stop_rx)));
        Ok(())
    }

    /// Stop automatic syncing
    ///
    /// A submission already in flight runs to completion; the pass ends
    /// before the next item.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send_replace(true);
        }
        self.background_task = None;
    }

    /// Stop automatic syncing and wait for the task to wind down
    pub async fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send_replace(true);
        }
        if let Some(handle) = self.background_task.take() {
            if let Err(e) = handle.await {
                tracing::error!("Automatic sync task failed: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.background_task.is_some()
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.syncing.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> SyncState {
        let mut state = self.inner.state.read().await.clone();
        // A pass whose future was dropped never reaches its closing bookkeeping
        state.is_syncing = self.is_syncing();
        state
    }

    pub async fn metrics(&self) -> SyncMetrics {
        self.inner.metrics.read().await.clone()
    }

    pub fn queue(&self) -> &Arc<QueueStore> {
        &self.inner.queue
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.inner.monitor
    }

    pub fn policy(&self) -> RetryPolicy {
        self.inner.policy
    }
}

impl Drop for SyncOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("policy", &self.inner.policy)
            .field("is_syncing", &self.is_syncing())
            .field("is_running", &self.is_running())
            .finish()
    }
}
