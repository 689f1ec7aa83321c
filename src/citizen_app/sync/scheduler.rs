//! # Reconnect Scheduler
//!
//! Decides when the orchestrator syncs on its own. A pass is scheduled when
//! the device comes back online, or when a report is queued while online,
//! provided the queue is non-empty and no pass is running. The pass starts
//! only after the settle delay has elapsed with the link still up; a flip
//! during the delay restarts the wait, and going offline abandons it.
//!
//! A trigger that arrives while a pass runs is dropped. Items that failed in
//! a pass wait for the next trigger or a manual sync.

use crate::citizen_app::sync::network_monitor::NetworkStatus;
use std::time::Duration;
use tokio::sync::watch;

/// Default wait between reconnect and the automatic pass
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(2000);

/// Snapshot of what the scheduler looks at
#[derive(Debug, Clone, Copy)]
pub struct TriggerConditions {
    pub status: NetworkStatus,
    pub queue_length: usize,
    pub is_syncing: bool,
}

impl TriggerConditions {
    pub fn should_sync(&self) -> bool {
        self.status.is_online() && self.queue_length > 0 && !self.is_syncing
    }
}

/// Event that may lead to an automatic pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Reconnected,
    Enqueued,
}

/// Outcome of waiting through the settle delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Link stayed up for the whole delay
    Elapsed,
    /// Link went down, give up until the next reconnect
    WentOffline,
    /// A source closed; the scheduler should stop
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct SyncScheduler {
    settle_delay: Duration,
}

impl SyncScheduler {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Wait for the next event worth a pass
    ///
    /// Returns `None` once either source is closed.
    pub async fn next_trigger(
        &self,
        network: &mut watch::Receiver<NetworkStatus>,
        queue_length: &mut watch::Receiver<usize>,
        last_length: &mut usize,
    ) -> Option<Trigger> {
        loop {
            tokio::select! {
                changed = network.changed() => {
                    changed.ok()?;
                    if network.borrow_and_update().is_online() {
                        return Some(Trigger::Reconnected);
                    }
                }
                changed = queue_length.changed() => {
                    changed.ok()?;
                    let length = *queue_length.borrow_and_update();
                    let grew = length > *last_length;
                    *last_length = length;
                    if grew {
                        return Some(Trigger::Enqueued);
                    }
                }
            }
        }
    }

    /// Wait for the link to stay up for the settle delay
    pub async fn settle(&self, network: &mut watch::Receiver<NetworkStatus>) -> Settle {
        loop {
            if !network.borrow_and_update().is_online() {
                return Settle::WentOffline;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.settle_delay) => return Settle::Elapsed,
                changed = network.changed() => {
                    if changed.is_err() {
                        return Settle::Closed;
                    }
                    // Flapping: restart the delay from the latest status
                }
            }
        }
    }
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}
