//! # Sync State Management
//!
//! Outcome of sync passes and the status the UI layer surfaces: whether a
//! pass is running, what the last one achieved and the failure summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a pass returned without touching the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleReason {
    Offline,
    EmptyQueue,
    AlreadySyncing,
}

/// Failure of one item during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub id: String,
    pub error: String,
}

/// Aggregate result of one `sync_now` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// True when no item failed
    pub success: bool,
    pub synced: usize,
    pub failed: usize,
    /// Items left alone because they used up their attempts
    pub skipped: usize,
    pub errors: Vec<ItemError>,
    /// Set when the pass short-circuited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle: Option<IdleReason>,
}

impl SyncReport {
    /// Result of a pass that did nothing
    pub fn idle(reason: IdleReason) -> Self {
        Self {
            success: true,
            synced: 0,
            failed: 0,
            skipped: 0,
            errors: Vec::new(),
            idle: Some(reason),
        }
    }

    pub(crate) fn started() -> Self {
        Self {
            success: true,
            synced: 0,
            failed: 0,
            skipped: 0,
            errors: Vec::new(),
            idle: None,
        }
    }

    pub(crate) fn record_failure(&mut self, id: &str, error: String) {
        self.failed += 1;
        self.success = false;
        self.errors.push(ItemError {
            id: id.to_string(),
            error,
        });
    }

    pub fn is_idle(&self) -> bool {
        self.idle.is_some()
    }

    /// Summary shown to the citizen after a pass with failures
    pub fn error_summary(&self) -> Option<String> {
        (self.failed > 0).then(|| format!("{} incident(s) could not be sent", self.failed))
    }
}

/// Observable orchestrator state
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub is_syncing: bool,
    /// End of the last pass that processed items
    pub last_sync: Option<DateTime<Utc>>,
    pub last_result: Option<SyncReport>,
    /// Failure summary of the last pass, cleared when a new pass starts
    pub sync_error: Option<String>,
}
