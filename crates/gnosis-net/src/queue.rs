use std::collections::VecDeque;

use parking_lot::Mutex;

/// A fixed-capacity FIFO shared between a socket thread and its caller.
pub(crate) struct BoundedQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        BoundedQueue {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Appends `item`; returns `false` without storing it if the queue
    /// is already at capacity.
    pub fn push(&self, item: T) -> bool {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return false;
        }
        items.push_back(item);
        true
    }

    pub fn pull(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.lock().len() >= self.capacity
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_capacity() {
        let q: BoundedQueue<i32> = BoundedQueue::new(2);
        assert!(q.push(1));
        assert!(q.push(2));
        assert!(!q.push(3));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn pulls_in_fifo_order() {
        let q: BoundedQueue<i32> = BoundedQueue::new(4);
        q.push(1);
        q.push(2);
        assert_eq!(q.pull(), Some(1));
        assert_eq!(q.pull(), Some(2));
        assert_eq!(q.pull(), None);
    }
}
