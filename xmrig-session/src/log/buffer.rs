use std::collections::VecDeque;

use serde::Serialize;

use super::classifier::LogEntry;

/// A log entry stamped with its insertion sequence number.
///
/// Sequence numbers increase in chronological order and are never reused,
/// so they make stable row keys for a UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub seq: u64,
    #[serde(flatten)]
    pub entry: LogEntry,
}

/// Accumulated worker log, newest batch first.
///
/// Each batch is inserted in front of everything already held, keeping its
/// own chronological order:
///
/// ```text
/// prepend [c1, c2]   ->  c1 c2
/// prepend [d1, d2]   ->  d1 d2 c1 c2
/// ```
///
/// The buffer holds at most `capacity` records. Older batches fall off the
/// back first; a single batch larger than the buffer keeps only its newest
/// lines.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    records: VecDeque<LogRecord>,
    capacity: usize,
    next_seq: u64,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Insert a chronological batch in front of the accumulated log.
    ///
    /// Returns the number of records evicted to stay within capacity.
    pub fn prepend_batch(&mut self, batch: Vec<LogEntry>) -> usize {
        let overflow = batch.len().saturating_sub(self.capacity);

        let stamped: Vec<LogRecord> = batch
            .into_iter()
            .skip(overflow)
            .map(|entry| {
                let seq = self.next_seq;
                self.next_seq += 1;
                LogRecord { seq, entry }
            })
            .collect();

        for record in stamped.into_iter().rev() {
            self.records.push_front(record);
        }

        let mut evicted = overflow;
        while self.records.len() > self.capacity {
            self.records.pop_back();
            evicted += 1;
        }
        evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter()
    }

    /// Records in display order.
    pub fn to_vec(&self) -> Vec<LogRecord> {
        self.records.iter().cloned().collect()
    }
}
