//! Hand-off queue between refill workers and consumers

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Thread-safe queue of ready items.
///
/// Built on an unbounded MPMC channel: `put` never blocks, `take` parks the
/// calling thread until an item arrives or the deadline passes. Every item
/// goes to exactly one receiver. Clones share the same queue.
///
/// # Examples
///
/// ```
/// use refill_objectpool::ItemQueue;
/// use std::time::Duration;
///
/// let queue = ItemQueue::new();
/// queue.put("ready");
/// assert_eq!(queue.take(Duration::from_millis(10)), Some("ready"));
/// assert_eq!(queue.take(Duration::from_millis(10)), None);
/// ```
pub struct ItemQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> ItemQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self { sender, receiver }
    }

    /// Insert an item, waking one waiting consumer if any
    pub fn put(&self, item: T) {
        // Both ends live in `self`, so the channel cannot be disconnected here.
        let _ = self.sender.send(item);
    }

    /// Remove one item, waiting at most `timeout`.
    ///
    /// Returns `None` when nothing arrived in time.
    pub fn take(&self, timeout: Duration) -> Option<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Remove one item if one is ready right now
    pub fn try_take(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T> Clone for ItemQueue<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<T> Default for ItemQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
