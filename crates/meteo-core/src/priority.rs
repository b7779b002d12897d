//! Priority queue kept as one sorted FIFO sequence.
//!
//! Items are ordered by `(priority, sequence)` ascending. The sequence
//! number is assigned on every enqueue, so equal-priority items come out in
//! arrival order and a re-enqueued item lines up behind everything of equal
//! or higher priority that is already waiting.

use std::fmt;

use crate::error::AppError;
use crate::fifo::FifoQueue;
use crate::task::TaskPriority;

#[derive(Debug, Clone)]
struct Entry<T, P> {
    item: T,
    priority: P,
    sequence: u64,
}

#[derive(Debug, Clone)]
pub struct PriorityQueue<T, P = TaskPriority> {
    entries: FifoQueue<Entry<T, P>>,
    next_sequence: u64,
}

impl<T, P: Ord> PriorityQueue<T, P> {
    pub fn new() -> Self {
        Self {
            entries: FifoQueue::new(),
            next_sequence: 1,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: FifoQueue::with_capacity(capacity),
            next_sequence: 1,
        }
    }

    /// Insert `item` behind every entry whose key is not greater than its own.
    ///
    /// Returns the sequence number assigned to this arrival.
    pub fn enqueue(&mut self, item: T, priority: P) -> Result<u64, AppError> {
        let sequence = self.next_sequence;
        // The sequence is sorted, so the first entry from the tail with a
        // smaller key marks the insertion point.
        let index = self
            .entries
            .iter()
            .rposition(|e| (&e.priority, e.sequence) < (&priority, sequence))
            .map_or(0, |i| i + 1);

        self.entries.insert(
            index,
            Entry {
                item,
                priority,
                sequence,
            },
        )?;
        self.next_sequence += 1;
        tracing::debug!(
            sequence,
            position = index,
            size = self.entries.len(),
            "Enqueued prioritized item"
        );
        Ok(sequence)
    }

    pub fn dequeue(&mut self) -> Result<T, AppError> {
        let entry = self.entries.dequeue()?;
        tracing::debug!(
            sequence = entry.sequence,
            size = self.entries.len(),
            "Dequeued prioritized item"
        );
        Ok(entry.item)
    }

    pub fn peek(&self) -> Result<&T, AppError> {
        self.entries.peek().map(|e| &e.item)
    }

    pub fn peek_priority(&self) -> Result<&P, AppError> {
        self.entries.peek().map(|e| &e.priority)
    }

    /// Remove the first entry (in dispatch order) matching `pred`.
    pub fn remove_first<F>(&mut self, mut pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let index = self.entries.iter().position(|e| pred(&e.item))?;
        self.entries.remove(index).map(|e| e.item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Items with their priority, head to tail.
    pub fn iter(&self) -> impl Iterator<Item = (&T, &P)> + Clone + '_ {
        self.entries.iter().map(|e| (&e.item, &e.priority))
    }
}

impl<T, P: Ord> Default for PriorityQueue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> fmt::Display for PriorityQueue<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            write!(f, "PriorityQueue(empty)")
        } else {
            write!(f, "PriorityQueue({} items)", self.entries.len())
        }
    }
}
