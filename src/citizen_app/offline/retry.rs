//! # Retry Policy
//!
//! Decides whether a queued item is still eligible for delivery. Failures
//! are not classified: a validation rejection and a dropped connection both
//! count as one failed attempt. Without a cap an item is retried on every
//! pass for as long as it stays queued.
//!
//! ## Usage
//!
//! ```rust
//! use geoinfo::citizen_app::offline::RetryPolicy;
//!
//! let policy = RetryPolicy::with_max_attempts(5);
//! assert!(policy.allows(4));
//! assert!(!policy.allows(5));
//! assert!(RetryPolicy::unlimited().allows(u32::MAX));
//! ```

use crate::citizen_app::offline::queue::QueueItem;

/// Attempt cap applied by sync passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Items with this many failed attempts are no longer submitted
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever
    pub fn unlimited() -> Self {
        Self { max_attempts: None }
    }

    /// Stop submitting an item after `max_attempts` failures
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }

    /// Whether an item with `attempts` failures may be submitted again
    pub fn allows(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }

    /// Whether the item has used up its attempts
    pub fn is_exhausted(&self, item: &QueueItem) -> bool {
        !self.allows(item.attempts)
    }
}
