//! Bounded drop-oldest speech queue.
//!
//! Producers never block: a full queue evicts its oldest item to make room.
//! A single consumer awaits items with [`SpeechQueue::dequeue`]; the returned
//! [`QueuedSpeech`] marks the item finished when dropped, which is what
//! [`SpeechQueue::drain`] waits for.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

struct QueueState {
    items: VecDeque<String>,
    /// Items enqueued but not yet finished (queued + in flight).
    unfinished: usize,
}

struct QueueShared {
    capacity: usize,
    state: Mutex<QueueState>,
    available: Notify,
    settled: Notify,
}

impl QueueShared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, count: usize) {
        let mut state = self.lock();
        state.unfinished = state.unfinished.saturating_sub(count);
        if state.unfinished == 0 {
            self.settled.notify_waiters();
        }
    }
}

/// Shared handle to a drop-oldest FIFO of texts awaiting synthesis.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct SpeechQueue {
    shared: Arc<QueueShared>,
}

impl SpeechQueue {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(QueueShared {
                capacity,
                state: Mutex::new(QueueState {
                    items: VecDeque::with_capacity(capacity),
                    unfinished: 0,
                }),
                available: Notify::new(),
                settled: Notify::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn len(&self) -> usize {
        self.shared.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().items.is_empty()
    }

    /// Queued texts, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.shared.lock().items.iter().cloned().collect()
    }

    /// Append `text`, evicting the oldest item if the queue is full.
    ///
    /// Returns the evicted text, if any.
    pub fn enqueue(&self, text: impl Into<String>) -> Option<String> {
        let evicted = {
            let mut state = self.shared.lock();
            let evicted = if state.items.len() >= self.shared.capacity {
                state.items.pop_front()
            } else {
                None
            };
            if evicted.is_none() {
                state.unfinished += 1;
            }
            state.items.push_back(text.into());
            evicted
        };
        self.shared.available.notify_one();
        evicted
    }

    /// Take the oldest item without waiting.
    pub fn try_dequeue(&self) -> Option<QueuedSpeech> {
        let text = self.shared.lock().items.pop_front()?;
        Some(QueuedSpeech {
            text,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Wait for and take the oldest item.
    ///
    /// Cancel-safe: dropping the future never loses an item.
    pub async fn dequeue(&self) -> QueuedSpeech {
        loop {
            if let Some(item) = self.try_dequeue() {
                return item;
            }
            self.shared.available.notified().await;
        }
    }

    /// Wait until every enqueued item has been consumed (dequeued and
    /// dropped) or evicted.
    pub async fn drain(&self) {
        loop {
            let settled = self.shared.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();
            if self.shared.lock().unfinished == 0 {
                return;
            }
            settled.await;
        }
    }

    /// Discard all queued items. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut state = self.shared.lock();
            let removed = state.items.len();
            state.items.clear();
            removed
        };
        if removed > 0 {
            self.shared.finish(removed);
        }
        removed
    }
}

impl fmt::Debug for SpeechQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechQueue")
            .field("capacity", &self.shared.capacity)
            .field("len", &self.len())
            .finish()
    }
}

/// An item taken from the queue. Dropping it marks the item finished.
pub struct QueuedSpeech {
    text: String,
    shared: Arc<QueueShared>,
}

impl QueuedSpeech {
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Debug for QueuedSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("QueuedSpeech").field(&self.text).finish()
    }
}

impl Drop for QueuedSpeech {
    fn drop(&mut self) {
        self.shared.finish(1);
    }
}
