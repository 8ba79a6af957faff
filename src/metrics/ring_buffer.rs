//! Bounded ring of retained window summaries.
//!
//! Owned by the consumer thread, so no synchronization is needed here.
//! When the ring is full the oldest entry is evicted to make room.

use std::collections::VecDeque;

/// Fixed-capacity FIFO that evicts its oldest entry on overflow
#[derive(Debug, Clone)]
pub struct HistoryRing<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> HistoryRing<T> {
    /// Create a new ring with the specified capacity
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push an entry, returning the evicted oldest one when full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.buffer.len() >= self.capacity {
            self.buffer.pop_front()
        } else {
            None
        };
        self.buffer.push_back(item);
        evicted
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<&T> {
        self.buffer.back()
    }

    /// Get current number of entries
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if ring is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get ring capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

}

impl<T: Clone> HistoryRing<T> {
    /// Copy of the entries, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.buffer.iter().cloned().collect()
    }
}
