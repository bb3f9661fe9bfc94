//! # Pending posts and their queue.
//!
//! A [`PendingPost`] carries one `(subscription, event)` delivery from the
//! posting thread to a scheduler. Records are leased from a [`PendingPostPool`]
//! and handed back, cleared, right after the delivery is taken out of them.
//!
//! ```text
//! post ──► pool.obtain(sub, ev) ──► queue.enqueue ──► notify
//!                                        │
//! worker ◄── queue.poll / poll_timeout ◄─┘
//!   take() ──► pool.release(record) ──► invoke(sub, ev)
//! ```
//!
//! ## Rules
//! - FIFO; `enqueue` wakes one waiter of `poll_timeout`.
//! - A released record holds no subscription and no event.
//! - The pool retains at most `capacity` records; extra ones are dropped.
//! - A drained queue shrinks its ring buffer back to a small retained capacity.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::events::Event;
use crate::subscribers::Subscription;

const RETAINED_CAPACITY: usize = 16;

/// One queued delivery.
#[derive(Default)]
pub(crate) struct PendingPost {
    subscription: Option<Arc<Subscription>>,
    event: Option<Arc<dyn Event>>,
}

impl PendingPost {
    /// Moves the delivery out, leaving the record empty.
    pub(crate) fn take(&mut self) -> Option<(Arc<Subscription>, Arc<dyn Event>)> {
        let subscription = self.subscription.take();
        let event = self.event.take();
        subscription.zip(event)
    }
}

/// Capped free list of [`PendingPost`] records.
pub(crate) struct PendingPostPool {
    free: Mutex<Vec<Box<PendingPost>>>,
    capacity: usize,
}

impl PendingPostPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub(crate) fn obtain(
        &self,
        subscription: Arc<Subscription>,
        event: Arc<dyn Event>,
    ) -> Box<PendingPost> {
        let mut post = self.free.lock().pop().unwrap_or_default();
        post.subscription = Some(subscription);
        post.event = Some(event);
        post
    }

    pub(crate) fn release(&self, mut post: Box<PendingPost>) {
        post.subscription = None;
        post.event = None;
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(post);
        }
    }

    #[cfg(test)]
    pub(crate) fn retained(&self) -> usize {
        self.free.lock().len()
    }
}

/// Thread-safe FIFO of pending posts.
#[derive(Default)]
pub(crate) struct PendingPostQueue {
    items: Mutex<VecDeque<Box<PendingPost>>>,
    ready: Condvar,
}

impl PendingPostQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueue(&self, post: Box<PendingPost>) {
        self.items.lock().push_back(post);
        self.ready.notify_one();
    }

    /// Removes the head without waiting.
    pub(crate) fn poll(&self) -> Option<Box<PendingPost>> {
        let mut items = self.items.lock();
        let head = items.pop_front();
        Self::shrink_if_drained(&mut items);
        head
    }

    /// Removes the head, waiting up to `max_wait` for one to arrive.
    pub(crate) fn poll_timeout(&self, max_wait: Duration) -> Option<Box<PendingPost>> {
        let mut items = self.items.lock();
        if items.is_empty() {
            let _ = self.ready.wait_for(&mut items, max_wait);
        }
        let head = items.pop_front();
        Self::shrink_if_drained(&mut items);
        head
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn shrink_if_drained(items: &mut VecDeque<Box<PendingPost>>) {
        if items.is_empty() && items.capacity() > RETAINED_CAPACITY * 4 {
            items.shrink_to(RETAINED_CAPACITY);
        }
    }
}
