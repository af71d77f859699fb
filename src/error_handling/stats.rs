//! Sink statistics tracking.
//!
//! Thread-safe counters shared between producers (append path) and the
//! flush executor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::SinkMetric;

/// Thread-safe sink statistics tracker.
///
/// Every [`SinkMetric`] is initialized to zero on creation, so lookups never
/// miss. Share it across tasks with `Arc`.
pub struct SinkStats {
    counters: HashMap<SinkMetric, AtomicUsize>,
}

impl SinkStats {
    pub fn new() -> Self {
        let mut counters = HashMap::new();
        for metric in SinkMetric::iter() {
            counters.insert(metric, AtomicUsize::new(0));
        }
        SinkStats { counters }
    }

    /// Increment a counter by one.
    pub fn increment(&self, metric: SinkMetric) {
        self.add(metric, 1);
    }

    /// Add `amount` to a counter.
    pub fn add(&self, metric: SinkMetric, amount: usize) {
        if let Some(counter) = self.counters.get(&metric) {
            counter.fetch_add(amount, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map. \
                 This indicates a bug in SinkStats initialization.",
                metric
            );
        }
    }

    /// Current value of a counter.
    pub fn get(&self, metric: SinkMetric) -> usize {
        self.counters
            .get(&metric)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Point-in-time copy of all counters, in declaration order.
    pub fn snapshot(&self) -> Vec<(SinkMetric, usize)> {
        SinkMetric::iter().map(|m| (m, self.get(m))).collect()
    }

    /// Logs every non-zero counter at info level.
    pub fn log_summary(&self) {
        let mut any = false;
        for (metric, count) in self.snapshot() {
            if count > 0 {
                log::info!("   {}: {}", metric, count);
                any = true;
            }
        }
        if !any {
            log::info!("   no records processed");
        }
    }
}

impl Default for SinkStats {
    fn default() -> Self {
        Self::new()
    }
}
