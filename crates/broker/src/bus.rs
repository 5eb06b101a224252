//! Thread-safe FIFO carrying messages to the dispatch loop.
//!
//! One coarse mutex guards the whole queue. Push and pop are O(1), so the
//! critical sections are tiny; the mutex totally orders pushes from any
//! number of producer threads relative to each other and to pops, which is
//! what gives the bus its global FIFO guarantee.

use std::collections::VecDeque;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::message::Message;

/// Batch container sized for a typical dispatch drain.
pub type Drained = SmallVec<[Message; 8]>;

/// Ordered message queue shared between producers and the single consumer.
#[derive(Default)]
pub struct Bus {
    queue: Mutex<VecDeque<Message>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to the tail.
    pub fn push(&self, msg: Message) {
        self.queue.lock().push_back(msg);
    }

    /// Removes and returns the head, or `None` when the bus is empty.
    /// Never blocks beyond the queue mutex, never errors.
    pub fn pop(&self) -> Option<Message> {
        self.queue.lock().pop_front()
    }

    /// Pops up to `max` messages in FIFO order under a single lock hold.
    pub fn drain(&self, max: usize) -> Drained {
        let mut queue = self.queue.lock();
        let take = max.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Drops every queued message. Shutdown path only.
    pub fn clear(&self) {
        self.queue.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
