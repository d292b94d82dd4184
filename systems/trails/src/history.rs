use std::collections::{vec_deque, VecDeque};

/// Fixed-capacity FIFO that evicts its oldest item once full.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> HistoryQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// A zero capacity is promoted to one so the queue always retains the newest item.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an item, evicting the oldest one when the queue is at capacity.
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            let _ = self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Iterates over the retained items from oldest to newest.
    pub fn contents(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    /// Most recently pushed item.
    #[must_use]
    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Number of retained items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Reports whether nothing has been pushed since creation or the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of retained items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes every retained item.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> HistoryQueue<T> {
    /// Copies the retained items, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
