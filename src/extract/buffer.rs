use std::collections::HashMap;

use crate::SequenceRecord;

/// Number of buffered records that triggers a flush
pub const FLUSH_THRESHOLD: usize = 1024;

/// A matched record, with its mate in paired mode
pub type RecordPair = (SequenceRecord, Option<SequenceRecord>);

/// Worker-local accumulation of matched records, grouped by destination key
///
/// Keys are kept in the order they were first seen so that flushing visits
/// destinations deterministically.
#[derive(Debug, Clone, Default)]
pub struct BatchBuffer {
    batches: Vec<(String, Vec<RecordPair>)>,
    index: HashMap<String, usize>,
    len: usize,
}
impl BatchBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, pair: RecordPair) {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.batches.push((key.to_string(), Vec::new()));
                self.index.insert(key.to_string(), self.batches.len() - 1);
                self.batches.len() - 1
            }
        };
        self.batches[slot].1.push(pair);
        self.len += 1;
    }

    /// Total number of buffered records (pairs count once)
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len >= FLUSH_THRESHOLD
    }

    /// Drops every buffered record, returning how many there were
    pub fn clear(&mut self) -> usize {
        let dropped = self.len;
        self.batches.clear();
        self.index.clear();
        self.len = 0;
        dropped
    }

    /// Takes every batch out of the buffer, leaving it empty
    pub fn drain(&mut self) -> impl Iterator<Item = (String, Vec<RecordPair>)> + '_ {
        self.index.clear();
        self.len = 0;
        self.batches.drain(..)
    }
}
