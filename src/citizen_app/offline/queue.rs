//! # Incident Queue
//!
//! Durable FIFO of incident reports that have not reached the backend yet.
//! The in-memory list is the working copy; every mutation rewrites the whole
//! list under one storage key before returning, so an abrupt exit loses at
//! most the operation in flight.
//!
//! ## Features
//!
//! - **Persistent Queue**: Items survive app restarts
//! - **Soft Start**: Missing or corrupt stored data yields an empty queue
//! - **Failure Tracking**: Attempt counter and last error per item
//! - **Change Feed**: Queue length published on a watch channel
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use geoinfo::citizen_app::offline::QueueStore;
//! use geoinfo::citizen_app::storage::MemoryStore;
//! use geoinfo::shared::IncidentPayload;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = QueueStore::initialize(Arc::new(MemoryStore::new()));
//! let payload = IncidentPayload::new(
//!     "Overflowing bin",
//!     "The bin next to the bus stop has not been emptied in days.",
//!     "PROPRETE",
//!     33.59,
//!     -7.61,
//!     3,
//!     "device-42",
//! );
//! let enqueued = queue.enqueue(payload, None).await;
//! assert_eq!(queue.len().await, 1);
//! queue.remove(&enqueued.item.id).await;
//! assert!(queue.is_empty().await);
//! # }
//! ```

use crate::citizen_app::offline::attachment::{AttachmentError, AttachmentSource, StoredAttachment};
use crate::citizen_app::storage::KeyValueStore;
use crate::shared::IncidentPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

/// Storage key holding the serialized queue
pub const QUEUE_STORAGE_KEY: &str = "offline-incident-queue";

/// One pending incident submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Locally generated, unique id
    pub id: String,
    /// Business fields forwarded as-is to the submitter
    pub payload: IncidentPayload,
    /// Photo in storable form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<StoredAttachment>,
    /// When the item was queued
    pub enqueued_at: DateTime<Utc>,
    /// Failed delivery attempts so far
    #[serde(default)]
    pub attempts: u32,
    /// Cause of the last failed attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueueItem {
    fn new(payload: IncidentPayload, attachment: Option<StoredAttachment>) -> Self {
        let enqueued_at = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("offline_{}_{}", enqueued_at.timestamp_millis(), &suffix[..9]),
            payload,
            attachment,
            enqueued_at,
            attempts: 0,
            last_error: None,
        }
    }
}

/// Result of `QueueStore::enqueue`
///
/// The item is always queued; `attachment_error` is set when the photo
/// could not be converted and was dropped from the item.
#[derive(Debug)]
pub struct Enqueued {
    pub item: QueueItem,
    pub attachment_error: Option<AttachmentError>,
}

/// Persistent queue of pending incident submissions
#[derive(Debug)]
pub struct QueueStore {
    storage: Arc<dyn KeyValueStore>,
    items: RwLock<Vec<QueueItem>>,
    length: watch::Sender<usize>,
}

impl QueueStore {
    /// Load the queue from storage
    ///
    /// Never fails: unreadable or corrupt data is logged and discarded.
    pub fn initialize(storage: Arc<dyn KeyValueStore>) -> Self {
        let items = match storage.get(QUEUE_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<QueueItem>>(&raw) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!("Discarding corrupt offline queue: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!("Failed to load offline queue: {}", e);
                Vec::new()
            }
        };

        if !items.is_empty() {
            tracing::info!("Loaded {} queued incident(s) from storage", items.len());
        }

        let (length, _) = watch::channel(items.len());
        Self {
            storage,
            items: RwLock::new(items),
            length,
        }
    }

    /// Queue a new incident report
    ///
    /// Suspends while the attachment is converted to its storable form.
    pub async fn enqueue(&self, payload: IncidentPayload, attachment: Option<AttachmentSource>) -> Enqueued {
        let (stored, attachment_error) = match attachment {
            Some(source) => match StoredAttachment::encode(source).await {
                Ok(stored) => (Some(stored), None),
                Err(e) => {
                    tracing::warn!("Queuing incident without its photo: {}", e);
                    (None, Some(e))
                }
            },
            None => (None, None),
        };

        let item = QueueItem::new(payload, stored);

        let mut items = self.items.write().await;
        items.push(item.clone());
        self.persist(&items);
        tracing::debug!("Queued incident {} ({} pending)", item.id, items.len());

        Enqueued { item, attachment_error }
    }

    /// Remove an item; returns whether it was present
    pub async fn remove(&self, id: &str) -> bool {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|item| item.id != id);
        let removed = items.len() != before;
        if removed {
            self.persist(&items);
        }
        removed
    }

    /// Record a failed delivery attempt
    ///
    /// Returns the new attempt count, or `None` if the item is gone (for
    /// instance cleared while its submission was in flight).
    pub async fn record_failure(&self, id: &str, error: impl Into<String>) -> Option<u32> {
        let mut items = self.items.write().await;
        let item = items.iter_mut().find(|item| item.id == id)?;
        item.attempts += 1;
        item.last_error = Some(error.into());
        let attempts = item.attempts;
        self.persist(&items);
        Some(attempts)
    }

    /// Drop every queued item and erase the stored entry
    pub async fn clear(&self) {
        let mut items = self.items.write().await;
        items.clear();
        if let Err(e) = self.storage.remove(QUEUE_STORAGE_KEY) {
            tracing::error!("Failed to erase stored offline queue: {}", e);
        }
        self.length.send_replace(0);
    }

    /// Snapshot of the queue in enqueue order
    pub async fn list(&self) -> Vec<QueueItem> {
        self.items.read().await.clone()
    }

    /// Look up a single item
    pub async fn get(&self, id: &str) -> Option<QueueItem> {
        self.items.read().await.iter().find(|item| item.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Watch the queue length
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.length.subscribe()
    }

    /// Write the full queue to storage and publish the new length
    ///
    /// Storage failures are logged; the in-memory queue stays authoritative
    /// for the rest of the session.
    fn persist(&self, items: &[QueueItem]) {
        match serde_json::to_string(items) {
            Ok(json) => {
                if let Err(e) = self.storage.set(QUEUE_STORAGE_KEY, &json) {
                    tracing::error!("Failed to save offline queue: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize offline queue: {}", e),
        }
        self.length.send_replace(items.len());
    }
}
