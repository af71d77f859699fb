//! Flush buffer: batches records and writes them with bulk `INSERT`s.
//!
//! Records are projected into rows on `append` and accumulate in a pending
//! batch. A flush is triggered when the batch reaches `flush_size`, or when
//! `idle_flush_time` has passed since the last flush and something is
//! pending. All flushes run on one executor task, so two flushes never hit
//! the same connection at once; `append` only takes a short in-memory lock
//! and never waits on the database.
//!
//! Failed flushes are logged and their records dropped. There is no
//! re-queueing: this is where data can be lost.

mod executor;
mod pending;


use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{error, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::{Config, EVICTION_LOG_EVERY};
use crate::error_handling::{BufferError, ConfigurationError, SinkMetric, SinkStats};
use crate::mapping::ColumnMapper;
use crate::record::Record;
use crate::storage::connection::Connector;
use crate::storage::encoder::BatchEncoder;

use executor::{Command, FlushExecutor};
use pending::PendingBatch;

/// Why a flush ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Pending batch reached `flush_size`.
    Count,
    /// `idle_flush_time` elapsed since the last flush.
    Idle,
    /// Explicit `flush_now(false)`.
    Manual,
    /// Shutdown flush.
    Final,
}

impl std::fmt::Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FlushReason::Count => "batch full",
            FlushReason::Idle => "idle timeout",
            FlushReason::Manual => "manual",
            FlushReason::Final => "final",
        })
    }
}

/// Summary of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushResult {
    /// Records drained from the buffer.
    pub total: usize,
    /// Rows the database reported as inserted (duplicates skipped by
    /// `INSERT IGNORE` are not counted).
    pub inserted: u64,
    /// Records dropped because their statement failed.
    pub failed: usize,
}

/// State shared between producer handles and the executor.
pub(crate) struct Inner {
    pending: Mutex<PendingBatch>,
    mapper: ColumnMapper,
    stats: Arc<SinkStats>,
    table_name: String,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, PendingBatch> {
        // A panic while holding this lock cannot leave the batch half-updated.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a running flush buffer. Cheap to clone; all clones feed the
/// same batch.
#[derive(Clone)]
pub struct FlushBuffer {
    inner: Arc<Inner>,
    commands: mpsc::UnboundedSender<Command>,
}

impl FlushBuffer {
    /// Validates `config` and spawns the flush executor around `connector`.
    ///
    /// No database I/O happens here; the connection is opened by the first
    /// flush. Must be called from within a Tokio runtime.
    pub fn start<C: Connector>(config: &Config, connector: C) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let stats = Arc::new(SinkStats::new());
        let encoder = BatchEncoder::new(
            connector.dialect(),
            &config.table_name,
            config.column_map.columns(),
            config.insert_ignore,
        );
        let inner = Arc::new(Inner {
            pending: Mutex::new(PendingBatch::new(
                config.flush_size,
                config.max_buffered_records,
            )),
            mapper: ColumnMapper::new(config.column_map.clone(), Arc::clone(&stats)),
            stats,
            table_name: config.table_name.clone(),
            task: tokio::sync::Mutex::new(None),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let executor = FlushExecutor::new(
            connector,
            encoder,
            Arc::clone(&inner),
            config.idle_flush_time,
        );
        let handle = tokio::spawn(executor.run(rx, config.tick_interval()));
        if let Ok(mut task) = inner.task.try_lock() {
            *task = Some(handle);
        }

        info!(
            "Flush buffer started for table {} (flush_size={}, idle_flush_time={:.3}s, insert_ignore={})",
            config.table_name,
            config.flush_size,
            config.idle_flush_time.as_secs_f64(),
            config.insert_ignore
        );

        Ok(FlushBuffer {
            inner,
            commands: tx,
        })
    }

    /// Adds a record to the pending batch, scheduling a flush if the batch
    /// is now full. Never waits on the database.
    pub fn append(&self, record: &Record) -> Result<(), BufferError> {
        if self.inner.lock_pending().is_closed() {
            return Err(BufferError::AlreadyClosed);
        }
        let row = self.inner.mapper.project(record);
        let outcome = self.inner.lock_pending().push(row)?;
        self.inner.stats.increment(SinkMetric::RecordsReceived);

        if let Some(evicted) = outcome.evicted_total {
            self.inner.stats.increment(SinkMetric::RecordsEvicted);
            if evicted == 1 || evicted % EVICTION_LOG_EVERY == 0 {
                warn!(
                    "Pending buffer for {} is full, evicted oldest record ({} evicted so far)",
                    self.inner.table_name, evicted
                );
            }
        }

        if outcome.flush_due && self.commands.send(Command::CountTrigger).is_err() {
            error!(
                "Flush executor for {} is not running, records will not be written",
                self.inner.table_name
            );
        }
        Ok(())
    }

    /// Asks the executor to run the idle-time check now.
    pub fn tick(&self) -> Result<(), BufferError> {
        self.commands
            .send(Command::Tick)
            .map_err(|_| BufferError::ExecutorGone)
    }

    /// Drains the pending batch and flushes it, waiting for any in-flight
    /// flush first. Records appended meanwhile go into the next batch.
    pub async fn flush_now(&self, is_final: bool) -> Result<FlushResult, BufferError> {
        let reason = if is_final {
            FlushReason::Final
        } else {
            FlushReason::Manual
        };
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Flush { reason, reply })
            .map_err(|_| BufferError::ExecutorGone)?;
        rx.await.map_err(|_| BufferError::ExecutorGone)
    }

    /// Stops accepting records, performs the final flush, then closes the
    /// connection and waits for the executor to exit.
    ///
    /// Flush errors are logged and do not prevent the connection close.
    pub async fn shutdown(&self) -> Result<FlushResult, BufferError> {
        if !self.inner.lock_pending().close() {
            return Err(BufferError::AlreadyClosed);
        }
        info!("Shutting down flush buffer for {}", self.inner.table_name);

        let result = self.flush_now(true).await?;

        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Close { reply })
            .map_err(|_| BufferError::ExecutorGone)?;
        rx.await.map_err(|_| BufferError::ExecutorGone)?;

        if let Some(handle) = self.inner.task.lock().await.take() {
            if let Err(e) = handle.await {
                error!("Flush executor task failed: {}", e);
            }
        }
        Ok(result)
    }

    /// Records currently waiting for a flush.
    pub fn pending(&self) -> usize {
        self.inner.lock_pending().len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock_pending().is_closed()
    }

    pub fn stats(&self) -> Arc<SinkStats> {
        Arc::clone(&self.inner.stats)
    }
}
