//! Per-kind failure counters.
//!
//! Failed messages are counted by error kind so a summary can be logged on
//! shutdown.

use std::collections::HashMap;
use std::sync::Mutex;

use log::info;
use strum::IntoEnumIterator;

use super::types::ErrorKind;

/// Thread-safe failure counters, one per [`ErrorKind`].
#[derive(Debug, Default)]
pub struct ProcessingStats {
    counts: Mutex<HashMap<ErrorKind, u64>>,
}

impl ProcessingStats {
    /// Creates an empty counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the counter for the given kind.
    pub fn increment(&self, kind: ErrorKind) {
        let mut counts = self.counts.lock().expect("stats mutex poisoned");
        *counts.entry(kind).or_insert(0) += 1;
    }

    /// Returns the current count for the given kind.
    pub fn count(&self, kind: ErrorKind) -> u64 {
        let counts = self.counts.lock().expect("stats mutex poisoned");
        counts.get(&kind).copied().unwrap_or(0)
    }

    /// Total failures across all kinds.
    pub fn total(&self) -> u64 {
        let counts = self.counts.lock().expect("stats mutex poisoned");
        counts.values().sum()
    }

    /// Logs a per-kind failure summary; silent when nothing failed.
    pub fn log_summary(&self) {
        if self.total() == 0 {
            return;
        }
        info!("Failure counts by kind:");
        for kind in ErrorKind::iter() {
            let count = self.count(kind);
            if count > 0 {
                info!("   {}: {}", kind, count);
            }
        }
    }
}
