//! Per-key attempt bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attempt history for a single key.
///
/// Pure data: when the first and last attempts happened and how many attempts
/// have been recorded since the counting window last reset. A record with no
/// attempts has `count == 0` and both timestamps unset.
///
/// Timestamps serialize as epoch microseconds so a stored snapshot
/// reserializes byte-for-byte, which the remote backend's compare-and-swap
/// relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// First attempt in the current counting window.
    #[serde(with = "chrono::serde::ts_microseconds_option")]
    first_attempt: Option<DateTime<Utc>>,
    /// Most recent attempt.
    #[serde(with = "chrono::serde::ts_microseconds_option")]
    last_attempt: Option<DateTime<Utc>>,
    /// Attempts recorded since the window last reset.
    count: u32,
}

impl AttemptRecord {
    /// Create an empty record with no attempts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attempt now.
    pub fn increment(&mut self) {
        self.count += 1;
        self.last_attempt = Some(Utc::now());
        if self.first_attempt.is_none() {
            self.first_attempt = self.last_attempt;
        }
    }

    /// Start a fresh counting window with this attempt as its first.
    pub fn reset(&mut self) {
        let now = Utc::now();
        self.first_attempt = Some(now);
        self.last_attempt = Some(now);
        self.count = 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn first_attempt(&self) -> Option<DateTime<Utc>> {
        self.first_attempt
    }

    pub fn last_attempt(&self) -> Option<DateTime<Utc>> {
        self.last_attempt
    }

    pub fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    pub fn set_first_attempt(&mut self, at: Option<DateTime<Utc>>) {
        self.first_attempt = at;
    }

    pub fn set_last_attempt(&mut self, at: Option<DateTime<Utc>>) {
        self.last_attempt = at;
    }
}
