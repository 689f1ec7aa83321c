//! # Sync Metrics
//!
//! Counters over the lifetime of an orchestrator: passes run, items
//! delivered and failed, pass durations.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct SyncMetrics {
    /// Passes that started processing the queue
    pub total_passes: u64,
    /// Passes that reached their closing bookkeeping
    pub completed_passes: u64,
    /// Passes that finished without failures
    pub clean_passes: u64,
    /// Calls that short-circuited (offline, empty, already syncing)
    pub idle_calls: u64,
    pub items_synced: u64,
    pub items_failed: u64,
    pub average_pass_duration: Duration,
    pub last_pass_duration: Option<Duration>,
    pub last_pass_start: Option<Instant>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_idle(&mut self) {
        self.idle_calls += 1;
    }

    pub fn record_pass_start(&mut self) {
        self.last_pass_start = Some(Instant::now());
        self.total_passes += 1;
    }

    pub fn record_pass_end(&mut self, synced: usize, failed: usize) {
        self.completed_passes += 1;
        self.items_synced += synced as u64;
        self.items_failed += failed as u64;
        if failed == 0 {
            self.clean_passes += 1;
        }

        if let Some(start) = self.last_pass_start.take() {
            let duration = start.elapsed();
            self.last_pass_duration = Some(duration);

            // Rolling average over completed passes
            let completed = self.completed_passes.max(1) as u32;
            let total_duration = self.average_pass_duration * (completed - 1) + duration;
            self.average_pass_duration = total_duration / completed;
        }
    }

    /// Share of submissions that went through
    pub fn delivery_rate(&self) -> f64 {
        let attempted = self.items_synced + self.items_failed;
        if attempted == 0 {
            0.0
        } else {
            self.items_synced as f64 / attempted as f64
        }
    }
}
