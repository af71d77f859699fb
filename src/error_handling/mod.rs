//! Error handling and sink statistics.
//!
//! This module provides:
//! - Error type definitions for each failure domain (configuration,
//!   connection, execution, buffer lifecycle, input parsing)
//! - Thread-safe counters for everything the sink does
//!
//! Connection and execution errors never reach record producers; they are
//! caught at the flush boundary, logged, and counted here.

mod stats;
mod types;

// Re-export public API
pub use stats::SinkStats;
pub use types::{
    BufferError, ConfigurationError, ConnectionError, ExecutionError, FlushError,
    InitializationError, RecordError, SinkMetric,
};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_sink_stats_initialization() {
        let stats = SinkStats::new();
        for metric in SinkMetric::iter() {
            assert_eq!(stats.get(metric), 0);
        }
    }

    #[test]
    fn test_sink_stats_increment_and_add() {
        let stats = SinkStats::new();
        stats.increment(SinkMetric::RecordsReceived);
        stats.increment(SinkMetric::RecordsReceived);
        stats.add(SinkMetric::RowsInserted, 42);

        assert_eq!(stats.get(SinkMetric::RecordsReceived), 2);
        assert_eq!(stats.get(SinkMetric::RowsInserted), 42);
        assert_eq!(stats.get(SinkMetric::FlushesFailed), 0);
    }

    #[test]
    fn test_snapshot_follows_declaration_order() {
        let stats = SinkStats::new();
        stats.increment(SinkMetric::MissingField);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.len(), SinkMetric::iter().count());
        assert_eq!(snapshot[0].0, SinkMetric::RecordsReceived);
        assert!(snapshot.contains(&(SinkMetric::MissingField, 1)));
    }

    #[test]
    fn test_flush_error_wraps_sources() {
        let err: FlushError = ConnectionError::NotOpen.into();
        assert!(matches!(err, FlushError::Connection(_)));
        assert_eq!(err.to_string(), "connection is not open");

        let err: FlushError =
            ExecutionError::Statement(sqlx::Error::Protocol("duplicate".into())).into();
        assert!(matches!(err, FlushError::Execution(_)));
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_configuration_error_messages() {
        let err = ConfigurationError::InvalidIdentifier {
            name: "x; DROP".into(),
            reason: "contains invalid character ';'".into(),
        };
        assert!(err.to_string().contains("x; DROP"));
        assert_eq!(
            ConfigurationError::Missing("table_name").to_string(),
            "missing required setting: table_name"
        );
    }
}
