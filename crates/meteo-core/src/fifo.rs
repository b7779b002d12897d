//! First-in-first-out queue with an optional capacity bound.

use std::collections::VecDeque;
use std::collections::vec_deque;
use std::fmt;

use crate::error::AppError;

/// Ordered FIFO container.
///
/// `enqueue` appends at the tail, `dequeue` and `peek` work on the head.
/// Size queries are O(1).
#[derive(Debug, Clone)]
pub struct FifoQueue<T> {
    items: VecDeque<T>,
    capacity: Option<usize>,
}

impl<T> FifoQueue<T> {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
            capacity: None,
        }
    }

    /// Queue that rejects `enqueue` once it holds `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn enqueue(&mut self, item: T) -> Result<(), AppError> {
        self.ensure_room()?;
        self.items.push_back(item);
        tracing::debug!(size = self.items.len(), "Enqueued item");
        Ok(())
    }

    pub fn dequeue(&mut self) -> Result<T, AppError> {
        let item = self.items.pop_front().ok_or(AppError::EmptyQueue)?;
        tracing::debug!(size = self.items.len(), "Dequeued item");
        Ok(item)
    }

    pub fn peek(&self) -> Result<&T, AppError> {
        self.items.front().ok_or(AppError::EmptyQueue)
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.items.len() >= cap)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        tracing::debug!("Queue cleared");
    }

    /// Head-to-tail view of the current contents. The iterator is `Clone`,
    /// so it can be restarted without touching the queue.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    fn ensure_room(&self) -> Result<(), AppError> {
        match self.capacity {
            Some(cap) if self.items.len() >= cap => {
                tracing::warn!(capacity = cap, "Queue is full, cannot enqueue item");
                Err(AppError::QueueFull(cap))
            }
            _ => Ok(()),
        }
    }

    /// Insert at `index` (0 = head). Capacity applies as for `enqueue`.
    pub(crate) fn insert(&mut self, index: usize, item: T) -> Result<(), AppError> {
        self.ensure_room()?;
        self.items.insert(index, item);
        Ok(())
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        self.items.remove(index)
    }
}

impl<T> Default for FifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a FifoQueue<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> fmt::Display for FifoQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            write!(f, "Queue(empty)")
        } else {
            write!(f, "Queue({} items)", self.items.len())
        }
    }
}
