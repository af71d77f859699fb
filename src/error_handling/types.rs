//! Error type definitions.
//!
//! This module defines all error types used throughout the sink, plus the
//! metric kinds tracked by [`SinkStats`](super::SinkStats).

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Invalid or missing settings. Fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A required setting was not supplied.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// The column map has no entries.
    #[error("column_map must contain at least one column")]
    EmptyColumnMap,

    /// The same destination column appears twice.
    #[error("column '{0}' is mapped more than once")]
    DuplicateColumn(String),

    /// A table or column name is not a plain SQL identifier.
    #[error("invalid SQL identifier '{name}': {reason}")]
    InvalidIdentifier {
        /// The rejected identifier.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A setting has an out-of-range or malformed value.
    #[error("invalid value for {setting}: {reason}")]
    InvalidValue {
        /// Setting name.
        setting: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The connection string could not be parsed or names an unsupported backend.
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),
}

/// The database connection could not be opened or was lost.
///
/// Never fatal: the next flush attempts to reconnect.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Opening a new connection failed.
    #[error("failed to open connection: {0}")]
    Open(#[source] sqlx::Error),

    /// `execute` was called without an open connection.
    #[error("connection is not open")]
    NotOpen,

    /// The connection broke while a statement was in flight.
    #[error("connection lost: {0}")]
    Lost(#[source] sqlx::Error),
}

/// The database rejected a statement.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The server returned an error for the statement (constraint violation, bad column, ...).
    #[error("statement failed: {0}")]
    Statement(#[source] sqlx::Error),
}

/// Anything that makes a flush fail. Caught at the flush boundary and logged.
#[derive(Error, Debug)]
pub enum FlushError {
    /// Connection-level failure; the connector is unusable until reopened.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Statement-level failure; the connection stays usable.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Errors returned to callers of the flush buffer handle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// `shutdown()` has already been called.
    #[error("flush buffer is already closed")]
    AlreadyClosed,

    /// The flush executor task is no longer running.
    #[error("flush executor is not running")]
    ExecutorGone,
}

/// Errors turning raw input into a [`Record`](crate::Record).
#[derive(Error, Debug)]
pub enum RecordError {
    /// The line is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Valid JSON, but not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Counters tracked by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum SinkMetric {
    /// Records accepted by `append`.
    RecordsReceived,
    /// Records handed to the database in a flush.
    RecordsFlushed,
    /// Rows the database reported as inserted.
    RowsInserted,
    /// Records lost because their flush failed.
    RecordsFailed,
    /// Records evicted because the pending buffer was full.
    RecordsEvicted,
    /// Mapped fields absent from a record.
    MissingField,
    /// Input lines that could not be parsed into a record.
    InvalidInput,
    /// Flushes that completed without error.
    FlushesSucceeded,
    /// Flushes where at least one statement failed.
    FlushesFailed,
    /// Successful connection opens.
    ConnectionsOpened,
    /// Failed connection opens or lost connections.
    ConnectionFailures,
}

impl std::fmt::Display for SinkMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SinkMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkMetric::RecordsReceived => "records received",
            SinkMetric::RecordsFlushed => "records flushed",
            SinkMetric::RowsInserted => "rows inserted",
            SinkMetric::RecordsFailed => "records lost to failed flushes",
            SinkMetric::RecordsEvicted => "records evicted (buffer full)",
            SinkMetric::MissingField => "missing mapped fields",
            SinkMetric::InvalidInput => "invalid input lines",
            SinkMetric::FlushesSucceeded => "flushes succeeded",
            SinkMetric::FlushesFailed => "flushes failed",
            SinkMetric::ConnectionsOpened => "connections opened",
            SinkMetric::ConnectionFailures => "connection failures",
        }
    }
}
