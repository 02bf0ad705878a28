//! Depth-bounded queue that drops the OLDEST element when full, matching
//! ROS `KeepLast(depth)` history semantics.

use std::collections::VecDeque;

use parking_lot::Mutex;

pub struct BoundedQueue<T> {
    data: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// A capacity of `usize::MAX` effectively makes the queue unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Push an item, dropping the oldest one if the queue is at capacity.
    ///
    /// Returns `true` if an item was dropped.
    pub fn push(&self, item: T) -> bool {
        let mut data = self.data.lock();
        let dropped = if data.len() >= self.capacity {
            data.pop_front();
            true
        } else {
            false
        };
        data.push_back(item);
        dropped
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<T> {
        self.data.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_when_full() {
        let queue = BoundedQueue::new(2);
        assert!(!queue.push(1));
        assert!(!queue.push(2));
        assert!(queue.push(3));
        assert_eq!(queue.try_recv(), Some(2));
        assert_eq!(queue.try_recv(), Some(3));
        assert_eq!(queue.try_recv(), None);
    }
}
