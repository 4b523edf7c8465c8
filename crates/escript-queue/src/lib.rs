//! Blocking FIFO queue for handing work between escript threads
//!
//! Producers push from any thread; consumers either poll with
//! [`MessageQueue::try_pop`] or block in [`MessageQueue::pop_wait`] until an
//! item arrives or the queue is canceled. Share a queue by wrapping it in an
//! `Arc`.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use derive_more::{Display, Error};

/// Returned by [`MessageQueue::pop_wait`] once the queue has been canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("Message queue canceled")]
pub struct Canceled;

struct State<T> {
    items: VecDeque<T>,
    canceled: bool,
}

pub struct MessageQueue<T> {
    state: Mutex<State<T>>,
    notifier: Condvar,
}

impl<T> MessageQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                canceled: false,
            }),
            notifier: Condvar::new(),
        }
    }

    /// Enqueue a copy of `item` and wake one waiter.
    pub fn push(&self, item: &T)
    where
        T: Clone,
    {
        self.push_move(item.clone());
    }

    /// Enqueue `item` and wake one waiter.
    pub fn push_move(&self, item: T) {
        let mut state = self.lock();
        state.items.push_back(item);
        self.notifier.notify_one();
    }

    /// Take the front item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Block until an item is available.
    ///
    /// Cancellation wins over pending items: once [`MessageQueue::cancel`]
    /// has been called every call returns `Err(Canceled)`.
    pub fn pop_wait(&self) -> Result<T, Canceled> {
        let mut state = self.lock();
        loop {
            if state.canceled {
                return Err(Canceled);
            }
            if let Some(item) = state.items.pop_front() {
                return Ok(item);
            }
            state = self
                .notifier
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Wake every waiter with `Err(Canceled)`. Calling it again is a no-op.
    pub fn cancel(&self) {
        let mut state = self.lock();
        if !state.canceled {
            tracing::debug!(pending = state.items.len(), "Message queue canceled");
        }
        state.canceled = true;
        self.notifier.notify_all();
    }

    pub fn is_canceled(&self) -> bool {
        self.lock().canceled
    }

    /// Number of queued items. Stale as soon as it returns.
    pub fn size(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether the queue is empty. Stale as soon as it returns.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for MessageQueue<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<T> std::fmt::Debug for MessageQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MessageQueue")
            .field("len", &state.items.len())
            .field("canceled", &state.canceled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = MessageQueue::new();
        queue.push(&"a".to_string());
        queue.push_move("b".to_string());
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.pop_wait(), Ok("a".to_string()));
        assert_eq!(queue.try_pop(), Some("b".to_string()));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_pop_on_empty_queue() {
        let queue: MessageQueue<i32> = MessageQueue::new();
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_cancel_wins_over_pending_items() {
        let queue = MessageQueue::new();
        queue.push_move(1);
        queue.cancel();
        queue.cancel();
        assert!(queue.is_canceled());
        assert_eq!(queue.pop_wait(), Err(Canceled));
        assert_eq!(queue.try_pop(), Some(1));
    }

    #[test]
    fn test_canceled_message() {
        assert_eq!(Canceled.to_string(), "Message queue canceled");
    }
}
