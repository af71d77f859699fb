//! Pending batch: records accumulated since the last flush.
//!
//! While no flush is running, every `flush_size` records are sealed into a
//! ready batch of their own, each owed exactly one count trigger. Records
//! that arrive while a flush is in flight keep accumulating in one open
//! batch, so all count triggers fired during that flush collapse into a
//! single follow-up flush.

use std::collections::VecDeque;

use crate::error_handling::BufferError;
use crate::record::Value;

pub(crate) type Row = Vec<Value>;

/// What happened when a row was pushed.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct PushOutcome {
    /// A count trigger must be sent for this push.
    pub flush_due: bool,
    /// Running eviction total, set when this push evicted the oldest row.
    pub evicted_total: Option<usize>,
}

pub(crate) struct PendingBatch {
    /// Sealed batches of `flush_size` rows, oldest first.
    ready: VecDeque<VecDeque<Row>>,
    /// Rows not yet sealed.
    rows: VecDeque<Row>,
    flush_size: usize,
    capacity: usize,
    /// A count trigger is queued for `rows`.
    flush_scheduled: bool,
    /// The executor is writing a batch taken from here.
    flushing: bool,
    closed: bool,
    evicted: usize,
}

impl PendingBatch {
    pub fn new(flush_size: usize, capacity: usize) -> Self {
        PendingBatch {
            ready: VecDeque::new(),
            rows: VecDeque::new(),
            flush_size,
            capacity: capacity.max(flush_size),
            flush_scheduled: false,
            flushing: false,
            closed: false,
            evicted: 0,
        }
    }

    /// Appends a row, evicting the oldest one when at capacity.
    pub fn push(&mut self, row: Row) -> Result<PushOutcome, BufferError> {
        if self.closed {
            return Err(BufferError::AlreadyClosed);
        }

        let mut outcome = PushOutcome::default();
        if self.len() >= self.capacity && self.evict_oldest() {
            self.evicted += 1;
            outcome.evicted_total = Some(self.evicted);
        }
        self.rows.push_back(row);

        if self.rows.len() >= self.flush_size {
            if self.flushing {
                // Coalesce into the flush that follows the in-flight one.
                outcome.flush_due = !self.flush_scheduled;
                self.flush_scheduled = true;
            } else {
                // A trigger already queued for these rows now covers the sealed batch.
                outcome.flush_due = !self.flush_scheduled;
                self.flush_scheduled = false;
                self.ready.push_back(std::mem::take(&mut self.rows));
            }
        }
        Ok(outcome)
    }

    fn evict_oldest(&mut self) -> bool {
        if let Some(front) = self.ready.front_mut() {
            front.pop_front();
            if front.is_empty() {
                self.ready.pop_front();
            }
            return true;
        }
        self.rows.pop_front().is_some()
    }

    /// Takes every pending row, sealed or not, in arrival order.
    pub fn take(&mut self) -> Vec<Row> {
        self.flush_scheduled = false;
        let mut rows = Vec::with_capacity(self.len());
        for batch in self.ready.drain(..) {
            rows.extend(batch);
        }
        rows.extend(self.rows.drain(..));
        self.mark_flushing(&rows);
        rows
    }

    /// Takes the batch one count trigger is owed: the oldest sealed batch,
    /// else the open batch if it reached `flush_size`.
    ///
    /// A count trigger goes stale when another flush drained its rows first;
    /// it then takes nothing.
    pub fn take_due(&mut self) -> Vec<Row> {
        let rows = match self.ready.pop_front() {
            Some(batch) => Vec::from(batch),
            None => {
                self.flush_scheduled = false;
                if self.rows.len() >= self.flush_size {
                    Vec::from(std::mem::take(&mut self.rows))
                } else {
                    Vec::new()
                }
            }
        };
        self.mark_flushing(&rows);
        rows
    }

    fn mark_flushing(&mut self, rows: &[Row]) {
        if !rows.is_empty() {
            self.flushing = true;
        }
    }

    /// Called by the executor once the batch it took has been written.
    pub fn finish_flush(&mut self) {
        self.flushing = false;
    }

    /// Marks the batch closed. Returns `false` if it already was.
    pub fn close(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.ready.iter().map(VecDeque::len).sum::<usize>() + self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(i: i64) -> Row {
        vec![Value::Integer(i)]
    }

    fn rows(range: std::ops::RangeInclusive<i64>) -> Vec<Row> {
        range.map(row).collect()
    }

    #[test]
    fn test_idle_burst_seals_flush_size_batches() {
        let mut batch = PendingBatch::new(2, 100);
        let due: Vec<bool> = (1..=5)
            .map(|i| batch.push(row(i)).unwrap().flush_due)
            .collect();
        assert_eq!(due, vec![false, true, false, true, false]);
        assert_eq!(batch.len(), 5);

        assert_eq!(batch.take_due(), rows(1..=2));
        batch.finish_flush();
        assert_eq!(batch.take_due(), rows(3..=4));
        batch.finish_flush();
        // Row 5 is below flush_size: a third trigger would be stale.
        assert!(batch.take_due().is_empty());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_pushes_during_flush_coalesce() {
        let mut batch = PendingBatch::new(2, 100);
        batch.push(row(1)).unwrap();
        assert!(batch.push(row(2)).unwrap().flush_due);
        assert_eq!(batch.take_due(), rows(1..=2));

        // In flight: only the first full batch asks for a trigger.
        let due: Vec<bool> = (3..=7)
            .map(|i| batch.push(row(i)).unwrap().flush_due)
            .collect();
        assert_eq!(due, vec![false, true, false, false, false]);

        batch.finish_flush();
        assert_eq!(batch.take_due(), rows(3..=7));
    }

    #[test]
    fn test_scheduled_rows_seal_after_flush_finishes() {
        let mut batch = PendingBatch::new(2, 100);
        batch.push(row(1)).unwrap();
        batch.push(row(2)).unwrap();
        batch.take_due();
        batch.push(row(3)).unwrap();
        assert!(batch.push(row(4)).unwrap().flush_due);
        batch.finish_flush();

        // The queued trigger already covers rows 3..=5 once they are sealed.
        assert!(!batch.push(row(5)).unwrap().flush_due);
        assert_eq!(batch.take_due(), rows(3..=5));
        assert!(batch.take_due().is_empty());
    }

    #[test]
    fn test_take_drains_sealed_and_open_rows_in_order() {
        let mut batch = PendingBatch::new(2, 100);
        for i in 1..=5 {
            batch.push(row(i)).unwrap();
        }
        assert_eq!(batch.take(), rows(1..=5));
        assert_eq!(batch.len(), 0);
        assert!(batch.take_due().is_empty());
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let mut batch = PendingBatch::new(2, 3);
        for i in 1..=3 {
            assert_eq!(batch.push(row(i)).unwrap().evicted_total, None);
        }
        assert_eq!(batch.push(row(4)).unwrap().evicted_total, Some(1));
        assert_eq!(batch.push(row(5)).unwrap().evicted_total, Some(2));
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.take(), rows(3..=5));
    }

    #[test]
    fn test_take_due_ignores_stale_trigger() {
        let mut batch = PendingBatch::new(3, 10);
        batch.push(row(1)).unwrap();
        assert!(batch.take_due().is_empty());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_large_sizes_do_not_preallocate() {
        let mut batch = PendingBatch::new(usize::MAX / 2, usize::MAX / 2);
        assert!(!batch.push(row(1)).unwrap().flush_due);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_push_after_close_rejected() {
        let mut batch = PendingBatch::new(2, 10);
        batch.push(row(1)).unwrap();
        assert!(batch.close());
        assert!(!batch.close());
        assert!(batch.is_closed());
        assert_eq!(batch.push(row(2)), Err(BufferError::AlreadyClosed));
        assert_eq!(batch.take(), vec![row(1)]);
    }
}
