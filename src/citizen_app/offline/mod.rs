//! # Offline Incident Queue
//!
//! Keeps incident reports that could not be delivered and hands them to the
//! sync orchestrator once connectivity returns.
//!
//! ## Architecture
//!
//! - **Attachment**: photo capture and its text encoding (`attachment.rs`)
//! - **Queue Store**: durable FIFO of pending reports (`queue.rs`)
//! - **Retry Policy**: optional cap on delivery attempts (`retry.rs`)
//!
//! `OfflineManager` ties the queue to a `ConnectivityMonitor` and a
//! `SyncOrchestrator` and is what a UI binds to.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use geoinfo::citizen_app::config::Config;
//! use geoinfo::citizen_app::offline::OfflineManager;
//! use geoinfo::citizen_app::storage::MemoryStore;
//! use geoinfo::citizen_app::sync::{submit_fn, ConnectivityMonitor, NetworkStatus};
//! use geoinfo::shared::IncidentPayload;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let monitor = ConnectivityMonitor::new(NetworkStatus::Offline);
//! let manager = OfflineManager::new(
//!     &Config::new(),
//!     Arc::new(MemoryStore::new()),
//!     monitor.clone(),
//!     Arc::new(submit_fn(|_payload, _photo| async { Ok(()) })),
//! );
//!
//! let payload = IncidentPayload::new(
//!     "Overflowing bin",
//!     "The bin next to the school gate has not been emptied.",
//!     "PROPRETE",
//!     34.02,
//!     -6.83,
//!     2,
//!     "device-1",
//! );
//! manager.add_to_queue(payload, None).await;
//! assert_eq!(manager.queue_length(), 1);
//!
//! monitor.set_status(NetworkStatus::Online);
//! let report = manager.sync_queue().await;
//! assert_eq!(report.synced, 1);
//! assert!(!manager.has_queued_items());
//! # }
//! ```

pub mod attachment;
pub mod queue;
pub mod retry;

pub use attachment::{Attachment, AttachmentError, AttachmentSource, StoredAttachment};
pub use queue::{Enqueued, QueueItem, QueueStore, QUEUE_STORAGE_KEY};
pub use retry::RetryPolicy;

use crate::citizen_app::config::Config;
use crate::citizen_app::storage::KeyValueStore;
use crate::citizen_app::sync::{
    ConnectivityMonitor, SubmitError, Submitter, SyncOrchestrator, SyncReport,
};
use crate::shared::{IncidentPayload, SharedError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Outcome of `OfflineManager::submit_or_queue`
#[derive(Debug)]
pub enum Submission {
    /// Delivered straight to the backend
    Sent,
    /// Stored for a later sync pass
    Queued {
        enqueued: Enqueued,
        /// Why direct delivery was not possible, `None` when offline
        reason: Option<SubmitError>,
    },
}

impl Submission {
    pub fn is_sent(&self) -> bool {
        matches!(self, Submission::Sent)
    }
}

/// Snapshot of the queue for status displays
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Number of reports waiting to be sent
    pub pending: usize,
    /// Reports that failed at least once
    pub failed: usize,
    /// Reports the retry policy no longer attempts
    pub exhausted: usize,
    /// Reports carrying a photo
    pub with_photo: usize,
}

/// Main offline manager coordinating the queue and its synchronisation
pub struct OfflineManager {
    queue: Arc<QueueStore>,
    monitor: ConnectivityMonitor,
    submitter: Arc<dyn Submitter>,
    orchestrator: SyncOrchestrator,
    settle_delay: Duration,
    queue_length: watch::Receiver<usize>,
}

impl OfflineManager {
    /// Create a new offline manager, restoring any persisted queue
    pub fn new(
        config: &Config,
        storage: Arc<dyn KeyValueStore>,
        monitor: ConnectivityMonitor,
        submitter: Arc<dyn Submitter>,
    ) -> Self {
        let queue = Arc::new(QueueStore::initialize(storage));
        let queue_length = queue.subscribe();
        let orchestrator = SyncOrchestrator::new(
            Arc::clone(&queue),
            monitor.clone(),
            Arc::clone(&submitter),
            config.retry_policy(),
        );

        Self {
            queue,
            monitor,
            submitter,
            orchestrator,
            settle_delay: config.reconnect_settle_delay(),
            queue_length,
        }
    }

    /// Start automatic syncing on reconnect and on enqueue
    pub fn start(&mut self) -> Result<(), String> {
        self.orchestrator.start(self.settle_delay)
    }

    /// Stop automatic syncing
    pub fn stop(&mut self) {
        self.orchestrator.stop();
    }

    /// Stop automatic syncing and wait for a pass in flight to end
    pub async fn shutdown(&mut self) {
        self.orchestrator.shutdown().await;
    }

    pub fn queue_length(&self) -> usize {
        *self.queue_length.borrow()
    }

    pub fn has_queued_items(&self) -> bool {
        self.queue_length() > 0
    }

    /// Watch the queue length, for badges and counters
    pub fn subscribe_queue_length(&self) -> watch::Receiver<usize> {
        self.queue.subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    pub fn is_syncing(&self) -> bool {
        self.orchestrator.is_syncing()
    }

    /// Summary of the last pass that had failures
    pub async fn sync_error(&self) -> Option<String> {
        self.orchestrator.state().await.sync_error
    }

    pub async fn last_sync_result(&self) -> Option<SyncReport> {
        self.orchestrator.state().await.last_result
    }

    pub async fn add_to_queue(
        &self,
        payload: IncidentPayload,
        attachment: Option<AttachmentSource>,
    ) -> Enqueued {
        self.queue.enqueue(payload, attachment).await
    }

    pub async fn remove_from_queue(&self, id: &str) -> bool {
        self.queue.remove(id).await
    }

    pub async fn clear_queue(&self) {
        self.queue.clear().await;
    }

    pub async fn queued_items(&self) -> Vec<QueueItem> {
        self.queue.list().await
    }

    /// Run one sync pass now
    pub async fn sync_queue(&self) -> SyncReport {
        self.orchestrator.sync_now().await
    }

    /// Send a validated report directly, falling back to the queue
    ///
    /// Offline, the report is queued without an attempt. Online, a failed
    /// delivery queues it with the failure recorded.
    pub async fn submit_or_queue(
        &self,
        payload: IncidentPayload,
        attachment: Option<AttachmentSource>,
    ) -> Result<Submission, SharedError> {
        payload.validate()?;

        if !self.monitor.is_online() {
            tracing::info!("Offline, queueing incident '{}'", payload.title);
            let enqueued = self.queue.enqueue(payload, attachment).await;
            return Ok(Submission::Queued { enqueued, reason: None });
        }

        // Loaded once and kept as a source so a failed send can still be queued
        let (photo, source) = match attachment {
            Some(source) => match source.load().await {
                Ok(photo) => (Some(photo.clone()), Some(AttachmentSource::InMemory(photo))),
                Err(e) => {
                    tracing::warn!("Photo unavailable, sending report without it: {}", e);
                    (None, None)
                }
            },
            None => (None, None),
        };

        match self.submitter.submit(&payload, photo).await {
            Ok(()) => {
                tracing::info!("Incident '{}' sent", payload.title);
                Ok(Submission::Sent)
            }
            Err(error) => {
                tracing::warn!("Sending failed, queueing incident '{}': {}", payload.title, error);
                let enqueued = self.queue.enqueue(payload, source).await;
                self.queue
                    .record_failure(&enqueued.item.id, error.to_string())
                    .await;
                Ok(Submission::Queued {
                    enqueued,
                    reason: Some(error),
                })
            }
        }
    }

    /// Get queue statistics
    pub async fn stats(&self) -> QueueStats {
        let policy = self.orchestrator.policy();
        self.queue
            .list()
            .await
            .iter()
            .fold(QueueStats::default(), |mut stats, item| {
                stats.pending += 1;
                if item.attempts > 0 {
                    stats.failed += 1;
                }
                if policy.is_exhausted(item) {
                    stats.exhausted += 1;
                }
                if item.attachment.is_some() {
                    stats.with_photo += 1;
                }
                stats
            })
    }

    /// Banner text for the current state, `None` when there is nothing to say
    pub async fn status_line(&self) -> Option<String> {
        let pending = self.queue_length();

        if !self.monitor.is_online() {
            return Some(if pending == 0 {
                "You are offline".to_string()
            } else {
                format!("You are offline — {} incident(s) waiting to be sent", pending)
            });
        }
        if pending == 0 {
            return None;
        }
        if self.is_syncing() {
            return Some(format!("Sending {} incident(s)…", pending));
        }
        match self.sync_error().await {
            Some(error) => Some(error),
            None => Some(format!("{} incident(s) waiting to be sent", pending)),
        }
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }
}

impl std::fmt::Debug for OfflineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineManager")
            .field("queue_length", &self.queue_length())
            .field("status", &self.monitor.current_status())
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}
