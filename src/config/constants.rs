//! Configuration constants.
//!
//! Defaults for every tunable setting. Each one can be overridden through
//! [`Config`](super::Config) or the matching CLI flag.

use std::time::Duration;

/// Records per batch before a count-triggered flush.
pub const DEFAULT_FLUSH_SIZE: usize = 10;

/// Time since the last flush after which a non-empty buffer is flushed.
pub const DEFAULT_IDLE_FLUSH_TIME: Duration = Duration::from_secs(1);

/// Upper bound on records held in memory while the database is unreachable.
/// When exceeded, the oldest pending record is evicted.
pub const DEFAULT_MAX_BUFFERED_RECORDS: usize = 10_000;

/// Largest accepted `flush_size`.
pub const MAX_FLUSH_SIZE: usize = 100_000;

/// Largest accepted `max_buffered_records`.
pub const MAX_BUFFERED_RECORDS: usize = 10_000_000;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// The flush timer wakes this many times per `idle_flush_time`.
pub const TICKS_PER_IDLE_PERIOD: u32 = 4;

/// Floor for the flush timer period.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Longest identifier segment MySQL accepts.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Eviction warnings are logged for the first eviction and then every Nth.
pub const EVICTION_LOG_EVERY: usize = 1000;
