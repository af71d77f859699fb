//! batch_sql_sink library: buffered bulk inserts of structured log records
//!
//! Records arrive one at a time, are projected onto a fixed column mapping,
//! and accumulate in a [`FlushBuffer`]. The buffer flushes with one multi-row
//! `INSERT` (or `INSERT IGNORE`) when it holds `flush_size` records or when
//! `idle_flush_time` has passed since the last flush. Values are always sent
//! as bound parameters.
//!
//! # Example
//!
//! ```no_run
//! use batch_sql_sink::{ColumnMap, Config, FlushBuffer, Record, SqlxConnector};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     connection_string: Some("mysql://db.internal:3306/logs".into()),
//!     username: Some("logger".into()),
//!     table_name: "events".into(),
//!     column_map: [("message", "message"), ("host", "hostname")]
//!         .into_iter()
//!         .collect::<ColumnMap>(),
//!     flush_size: 100,
//!     ..Default::default()
//! };
//!
//! let buffer = FlushBuffer::start(&config, SqlxConnector::new(config.connection_url()?)?)?;
//! buffer.append(&Record::new().with("message", "disk full").with("hostname", "web-1"))?;
//! let last = buffer.shutdown().await?;
//! println!("final flush wrote {} records", last.total - last.failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime: the flush executor is a spawned task.

mod app;
pub mod config;
mod error_handling;
pub mod initialization;
mod mapping;
mod record;
pub mod storage;

// Re-export public API
pub use app::{run_sink, run_sink_with, SinkReport};
pub use config::{Config, LogFormat, LogLevel, Opt};
pub use error_handling::{
    BufferError, ConfigurationError, ConnectionError, ExecutionError, FlushError,
    InitializationError, RecordError, SinkMetric, SinkStats,
};
pub use mapping::{ColumnMap, ColumnMapper, ColumnSpec};
pub use record::{Record, Value};
pub use storage::{
    encode, BatchEncoder, BatchStatement, Connector, Dialect, FlushBuffer, FlushReason,
    FlushResult, SqlxConnector,
};
