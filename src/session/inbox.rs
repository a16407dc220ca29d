//! Bounded, latest-wins queue of decoded responses.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::protocol::Message;

/// What happened to a pushed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Identical to the newest queued entry; a redundant delivery.
    Duplicate,
    /// Queued after evicting the oldest entry.
    Displaced(Message),
}

/// Per-session response inbox.
///
/// Only the freshest notifications matter, so a full inbox evicts its oldest
/// entry to admit a new one.
#[derive(Debug)]
pub struct Inbox {
    queue: Mutex<VecDeque<Message>>,
    notify: Notify,
    capacity: usize,
}

impl Inbox {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { queue: Mutex::new(VecDeque::with_capacity(capacity)), notify: Notify::new(), capacity }
    }

    pub fn push(&self, message: Message) -> PushOutcome {
        let outcome = {
            let mut queue = self.lock();
            if queue.back() == Some(&message) {
                return PushOutcome::Duplicate;
            }
            let evicted = if queue.len() >= self.capacity { queue.pop_front() } else { None };
            queue.push_back(message);
            evicted.map_or(PushOutcome::Queued, PushOutcome::Displaced)
        };
        self.notify.notify_one();
        outcome
    }

    /// Discard everything queued, returning how many entries were dropped.
    pub fn drain(&self) -> usize {
        let mut queue = self.lock();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait for the oldest queued message.
    pub async fn recv(&self) -> Message {
        loop {
            let next = self.lock().pop_front();
            if let Some(message) = next {
                return message;
            }
            self.notify.notified().await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Message>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
