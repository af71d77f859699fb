//! Configuration types.
//!
//! [`Config`] is the library-level configuration. It has no CLI dependencies
//! and can be constructed programmatically; the binary builds it from
//! [`Opt`](super::Opt).

use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::{
    DEFAULT_FLUSH_SIZE, DEFAULT_HOST, DEFAULT_IDLE_FLUSH_TIME, DEFAULT_MAX_BUFFERED_RECORDS,
    DEFAULT_MYSQL_PORT, MIN_TICK_INTERVAL, TICKS_PER_IDLE_PERIOD,
};
use crate::mapping::ColumnMap;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration.
///
/// # Examples
///
/// ```
/// use batch_sql_sink::{ColumnMap, Config};
///
/// let config = Config {
///     connection_string: Some("mysql://localhost:3306/logs".into()),
///     table_name: "events".into(),
///     column_map: [("message", "message"), ("host", "hostname")].into_iter().collect::<ColumnMap>(),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Full connection URL (`mysql://`, `mariadb://`, `sqlite:`; `jdbc:` prefix allowed).
    /// Takes precedence over `host`/`port`/`database`.
    pub connection_string: Option<String>,

    /// Database host, used when no connection string is given
    pub host: String,

    /// Database port, used when no connection string is given
    pub port: u16,

    /// Database name, used when no connection string is given
    pub database: Option<String>,

    /// Username (overrides one embedded in the connection string)
    pub username: Option<String>,

    /// Password (overrides one embedded in the connection string)
    pub password: Option<String>,

    /// Destination table, optionally `schema.table`
    pub table_name: String,

    /// Destination column -> source field, in insert order
    pub column_map: ColumnMap,

    /// Records per batch before a count-triggered flush
    pub flush_size: usize,

    /// Time since the last flush after which pending records are flushed
    pub idle_flush_time: Duration,

    /// Skip rows that violate unique constraints instead of failing the statement
    pub insert_ignore: bool,

    /// Require TLS for MySQL connections
    pub tls: bool,

    /// Pending records kept in memory before the oldest are evicted
    pub max_buffered_records: usize,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Period of the flush timer: a quarter of `idle_flush_time`, at least 10ms.
    pub fn tick_interval(&self) -> Duration {
        (self.idle_flush_time / TICKS_PER_IDLE_PERIOD).max(MIN_TICK_INTERVAL)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_string: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_MYSQL_PORT,
            database: None,
            username: None,
            password: None,
            table_name: String::new(),
            column_map: ColumnMap::new(),
            flush_size: DEFAULT_FLUSH_SIZE,
            idle_flush_time: DEFAULT_IDLE_FLUSH_TIME,
            insert_ignore: false,
            tls: true,
            max_buffered_records: DEFAULT_MAX_BUFFERED_RECORDS,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}
