//! Final run statistics.

use log::info;

use crate::error_handling::{SinkMetric, SinkStats};

/// Outcome of one sink run.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkReport {
    /// Records accepted into the buffer
    pub received: usize,
    /// Records written by successful statements
    pub flushed: usize,
    /// Rows the database reported as inserted
    pub inserted: usize,
    /// Records dropped by failed flushes
    pub failed: usize,
    /// Records evicted because the buffer was full
    pub evicted: usize,
    /// Input lines that were not valid records
    pub invalid: usize,
    /// Wall-clock duration of the run
    pub elapsed_seconds: f64,
}

impl SinkReport {
    pub fn from_stats(stats: &SinkStats, elapsed_seconds: f64) -> Self {
        SinkReport {
            received: stats.get(SinkMetric::RecordsReceived),
            flushed: stats.get(SinkMetric::RecordsFlushed),
            inserted: stats.get(SinkMetric::RowsInserted),
            failed: stats.get(SinkMetric::RecordsFailed),
            evicted: stats.get(SinkMetric::RecordsEvicted),
            invalid: stats.get(SinkMetric::InvalidInput),
            elapsed_seconds,
        }
    }

    /// Records that were accepted but never reached the table.
    pub fn lost(&self) -> usize {
        self.failed + self.evicted
    }
}

/// Logs every counter plus a one-line summary.
pub fn print_final_statistics(stats: &SinkStats, report: &SinkReport) {
    info!("Sink statistics:");
    stats.log_summary();
    info!(
        "Wrote {} of {} record{} ({} lost) in {:.1}s",
        report.flushed,
        report.received,
        if report.received == 1 { "" } else { "s" },
        report.lost(),
        report.elapsed_seconds
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_stats() {
        let stats = SinkStats::new();
        stats.add(SinkMetric::RecordsReceived, 12);
        stats.add(SinkMetric::RecordsFlushed, 9);
        stats.add(SinkMetric::RowsInserted, 8);
        stats.add(SinkMetric::RecordsFailed, 2);
        stats.add(SinkMetric::RecordsEvicted, 1);
        stats.increment(SinkMetric::InvalidInput);

        let report = SinkReport::from_stats(&stats, 1.5);
        assert_eq!(report.received, 12);
        assert_eq!(report.flushed, 9);
        assert_eq!(report.inserted, 8);
        assert_eq!(report.lost(), 3);
        assert_eq!(report.invalid, 1);
    }

    #[test]
    fn test_print_final_statistics_empty() {
        let stats = SinkStats::new();
        let report = SinkReport::from_stats(&stats, 0.0);
        // Should not panic when nothing was processed
        print_final_statistics(&stats, &report);
    }
}
