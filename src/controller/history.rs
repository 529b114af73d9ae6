//! Bounded transition log.

use std::collections::VecDeque;

use crate::model::TransitionRecord;

/// Number of transitions kept before the oldest is evicted.
pub const LOG_CAPACITY: usize = 50;

/// Append-only log of the most recent transitions, oldest first.
#[derive(Debug, Clone)]
pub struct TransitionLog {
    entries: VecDeque<TransitionRecord>,
    capacity: usize,
}

impl Default for TransitionLog {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl TransitionLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, record: TransitionRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TransitionRecord> + '_ {
        self.entries.iter()
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &TransitionRecord> + '_ {
        self.entries.iter().rev()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
