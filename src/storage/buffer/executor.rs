//! Flush executor: the single task that performs flushes.
//!
//! Flushes run strictly one at a time, in the order their triggers arrive.
//! While a flush is waiting on the database, producers keep appending into
//! the next batch; triggers that fire meanwhile queue up behind it and are
//! coalesced when they are processed.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::error_handling::{ConnectionError, FlushError, SinkMetric, SinkStats};
use crate::storage::connection::Connector;
use crate::storage::encoder::BatchEncoder;

use super::pending::Row;
use super::{FlushReason, FlushResult, Inner};

pub(super) enum Command {
    /// The batch reached `flush_size`.
    CountTrigger,
    /// Run the idle-time check now.
    Tick,
    /// Drain and flush whatever is pending, then reply.
    Flush {
        reason: FlushReason,
        reply: oneshot::Sender<FlushResult>,
    },
    /// Close the connection and stop.
    Close { reply: oneshot::Sender<()> },
}

pub(super) struct FlushExecutor<C> {
    connector: C,
    encoder: BatchEncoder,
    inner: Arc<Inner>,
    stats: Arc<SinkStats>,
    idle_flush_time: Duration,
    last_flush: Instant,
}

impl<C: Connector> FlushExecutor<C> {
    pub(super) fn new(
        connector: C,
        encoder: BatchEncoder,
        inner: Arc<Inner>,
        idle_flush_time: Duration,
    ) -> Self {
        let stats = Arc::clone(&inner.stats);
        FlushExecutor {
            connector,
            encoder,
            inner,
            stats,
            idle_flush_time,
            last_flush: Instant::now(),
        }
    }

    pub(super) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        tick_interval: Duration,
    ) {
        let mut timer = interval(tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Queued triggers go first so flushes keep their arrival order.
                biased;

                command = commands.recv() => match command {
                    Some(Command::CountTrigger) => {
                        let rows = self.inner.lock_pending().take_due();
                        self.flush(rows, FlushReason::Count).await;
                    }
                    Some(Command::Tick) => self.on_tick().await,
                    Some(Command::Flush { reason, reply }) => {
                        let rows = self.inner.lock_pending().take();
                        let result = self.flush(rows, reason).await;
                        let _ = reply.send(result);
                    }
                    Some(Command::Close { reply }) => {
                        self.connector.close().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        warn!(
                            "Flush buffer for {} dropped without shutdown, flushing remaining records",
                            self.inner.table_name
                        );
                        let rows = self.inner.lock_pending().take();
                        self.flush(rows, FlushReason::Final).await;
                        self.connector.close().await;
                        break;
                    }
                },
                _ = timer.tick() => self.on_tick().await,
            }
        }

        debug!("Flush executor for {} stopped", self.inner.table_name);
    }

    /// Time trigger: flush when `idle_flush_time` has passed since the last
    /// completed flush and something is pending.
    async fn on_tick(&mut self) {
        if self.last_flush.elapsed() < self.idle_flush_time {
            return;
        }
        let rows = self.inner.lock_pending().take();
        if !rows.is_empty() {
            self.flush(rows, FlushReason::Idle).await;
        }
    }

    /// Writes one drained batch. Failures are logged and counted here and
    /// never escape; rows of a failed statement are dropped, not re-queued.
    async fn flush(&mut self, rows: Vec<Row>, reason: FlushReason) -> FlushResult {
        if rows.is_empty() {
            return FlushResult::default();
        }

        let total = rows.len();
        debug!(
            "Flushing batch of {} records to {} ({})",
            total, self.inner.table_name, reason
        );

        let mut inserted = 0u64;
        let mut failed = 0usize;

        if let Err(e) = self.ensure_connected().await {
            error!(
                "Cannot connect to database, dropping {} records for {}: {}",
                total, self.inner.table_name, e
            );
            failed = total;
        } else {
            for statement in self.encoder.encode_chunks(&rows) {
                if !self.connector.is_usable() {
                    failed += statement.rows;
                    continue;
                }
                debug!("Generated SQL: {}", statement.sql);
                match self.connector.execute(&statement).await {
                    Ok(affected) => inserted += affected,
                    Err(e) => {
                        if matches!(e, FlushError::Connection(_)) {
                            self.stats.increment(SinkMetric::ConnectionFailures);
                        }
                        error!(
                            "Failed to insert {} records into {}, records dropped: {}",
                            statement.rows, self.inner.table_name, e
                        );
                        failed += statement.rows;
                    }
                }
            }
        }

        // Reset even on failure so the time trigger can't spin after an error.
        self.last_flush = Instant::now();
        self.inner.lock_pending().finish_flush();

        let result = FlushResult {
            total,
            inserted,
            failed,
        };
        self.record(&result, reason);
        result
    }

    async fn ensure_connected(&mut self) -> Result<(), ConnectionError> {
        if self.connector.is_usable() {
            match self.connector.ping().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    self.stats.increment(SinkMetric::ConnectionFailures);
                    warn!(
                        "Connection for {} went away while idle, reconnecting: {}",
                        self.inner.table_name, e
                    );
                }
            }
        }
        match self.connector.open().await {
            Ok(()) => {
                self.stats.increment(SinkMetric::ConnectionsOpened);
                Ok(())
            }
            Err(e) => {
                self.stats.increment(SinkMetric::ConnectionFailures);
                Err(e)
            }
        }
    }

    fn record(&self, result: &FlushResult, reason: FlushReason) {
        self.stats
            .add(SinkMetric::RecordsFlushed, result.total - result.failed);
        self.stats.add(SinkMetric::RowsInserted, result.inserted as usize);
        self.stats.add(SinkMetric::RecordsFailed, result.failed);

        if result.failed > 0 {
            self.stats.increment(SinkMetric::FlushesFailed);
            warn!(
                "Flush completed: {} written, {} failed out of {} total",
                result.total - result.failed,
                result.failed,
                result.total
            );
        } else {
            self.stats.increment(SinkMetric::FlushesSucceeded);
            if reason == FlushReason::Final {
                info!(
                    "Final flush wrote {} records ({} rows inserted)",
                    result.total, result.inserted
                );
            } else {
                debug!(
                    "Successfully flushed {} records ({} rows inserted)",
                    result.total, result.inserted
                );
            }
        }
    }
}
