//! # Network Monitor
//!
//! Tracks the platform's online/offline signal for the sync orchestrator.
//!
//! ## Features
//!
//! - **Connectivity Detection**: Last known online/offline status
//! - **Offline Notice**: `was_offline` flag for one-shot "back online" notices
//! - **Real-time Updates**: Status changes published on a watch channel
//!
//! The signal only reports link presence. A device on a captive portal
//! reads as online even though the backend is unreachable; such
//! submissions fail and stay queued.

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl NetworkStatus {
    pub fn is_online(self) -> bool {
        matches!(self, NetworkStatus::Online)
    }
}

impl From<bool> for NetworkStatus {
    fn from(online: bool) -> Self {
        if online {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        }
    }
}

#[derive(Debug)]
struct MonitorInner {
    status: watch::Sender<NetworkStatus>,
    was_offline: AtomicBool,
}

/// Observable connectivity state
///
/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

impl ConnectivityMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (status, _) = watch::channel(initial);
        Self {
            inner: Arc::new(MonitorInner {
                status,
                was_offline: AtomicBool::new(false),
            }),
        }
    }

    pub fn current_status(&self) -> NetworkStatus {
        *self.inner.status.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.current_status().is_online()
    }

    /// True after a drop to offline, until reconnect or acknowledgement
    pub fn was_offline(&self) -> bool {
        self.inner.was_offline.load(Ordering::SeqCst)
    }

    /// Acknowledge the offline notice
    pub fn clear_was_offline(&self) {
        self.inner.was_offline.store(false, Ordering::SeqCst);
    }

    /// Feed one platform notification
    pub fn set_status(&self, status: NetworkStatus) {
        self.inner
            .was_offline
            .store(status == NetworkStatus::Offline, Ordering::SeqCst);

        let previous = self.inner.status.send_replace(status);
        if previous != status {
            tracing::info!("Network status changed: {:?} -> {:?}", previous, status);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.inner.status.subscribe()
    }

    /// Stream of statuses, starting with the current one
    pub fn changes(&self) -> WatchStream<NetworkStatus> {
        WatchStream::new(self.subscribe())
    }

    /// Forward a platform signal into this monitor
    ///
    /// Notifications flow until the returned subscription is dropped or the
    /// signal ends.
    pub fn attach<S>(&self, signal: S) -> SignalSubscription
    where
        S: Stream<Item = NetworkStatus> + Send + 'static,
    {
        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            let mut signal = Box::pin(signal);
            while let Some(status) = signal.next().await {
                monitor.set_status(status);
            }
            tracing::debug!("Connectivity signal ended");
        });
        SignalSubscription { handle }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(NetworkStatus::Online)
    }
}

/// Registration of a platform signal on a monitor
#[derive(Debug)]
pub struct SignalSubscription {
    handle: JoinHandle<()>,
}

impl SignalSubscription {
    /// Whether the signal is still being forwarded
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for SignalSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
