//! # Per-thread posting state.
//!
//! Each thread keeps, per bus, a queue of events posted on it and the delivery
//! in progress. Only the outermost `post` on a thread drains the queue; a post
//! made from inside a synchronous handler is appended and delivered after the
//! current event has reached all its subscribers.
//!
//! ```text
//! post(A) ─► queue [A] ─► outermost? yes ─► drain:
//!              handler(A) ─► post(B) ─► queue [B] ─► outermost? no ─► return
//!            next ─► handler(B)
//! ```
//!
//! ## Rules
//! - No `RefCell` borrow is held while a subscriber runs.
//! - [`DrainGuard`] resets the posting state even when draining stops early;
//!   events still queued at that point are dropped with it.
//! - Cancellation is accepted only for the event currently being delivered (or
//!   one of its superclass views), from a `Posting` subscriber, on the posting
//!   thread.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::events::Event;
use crate::subscribers::ThreadMode;

#[derive(Default)]
struct PostingState {
    queue: VecDeque<Arc<dyn Event>>,
    is_posting: bool,
    is_main: bool,
    current: Option<(Arc<dyn Event>, ThreadMode)>,
    canceled: bool,
}

thread_local! {
    static STATES: RefCell<HashMap<u64, PostingState>> = RefCell::new(HashMap::new());
}

fn with_state<R>(bus: u64, f: impl FnOnce(&mut PostingState) -> R) -> R {
    STATES.with(|states| f(states.borrow_mut().entry(bus).or_default()))
}

/// Queues `event`; returns a guard if the caller is the outermost post and must drain.
pub(crate) fn enqueue(bus: u64, event: Arc<dyn Event>, is_main: impl FnOnce() -> bool) -> Option<DrainGuard> {
    let outermost = with_state(bus, |state| {
        state.queue.push_back(event);
        if state.is_posting {
            return false;
        }
        state.is_posting = true;
        true
    });
    if !outermost {
        return None;
    }
    let main = is_main();
    with_state(bus, |state| state.is_main = main);
    Some(DrainGuard { bus })
}

/// Resets the posting flags of one bus on this thread when dropped.
pub(crate) struct DrainGuard {
    bus: u64,
}

impl DrainGuard {
    pub(crate) fn next(&self) -> Option<Arc<dyn Event>> {
        with_state(self.bus, |state| state.queue.pop_front())
    }

    pub(crate) fn is_main(&self) -> bool {
        with_state(self.bus, |state| state.is_main)
    }

    /// Marks the start of one delivery.
    pub(crate) fn begin(&self, event: &Arc<dyn Event>, mode: ThreadMode) {
        with_state(self.bus, |state| {
            state.current = Some((Arc::clone(event), mode));
            state.canceled = false;
        });
    }

    /// Marks the end of one delivery; returns whether it canceled the event.
    pub(crate) fn end(&self) -> bool {
        let (current, canceled) = with_state(self.bus, |state| {
            (state.current.take(), std::mem::take(&mut state.canceled))
        });
        drop(current);
        canceled
    }
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        // events are dropped outside the borrow: their destructors may post
        let abandoned = STATES.with(|states| states.borrow_mut().remove(&self.bus));
        if let Some(state) = abandoned {
            if !state.queue.is_empty() {
                tracing::debug!(dropped = state.queue.len(), "posting stopped with events still queued");
            }
        }
    }
}

/// Requests that `event` is not delivered to the remaining subscriptions of the
/// type being delivered.
pub(crate) fn cancel(bus: u64, event: &dyn Event) -> Result<(), &'static str> {
    STATES.with(|states| {
        let mut states = states.borrow_mut();
        let Some(state) = states.get_mut(&bus).filter(|s| s.is_posting) else {
            return Err("may only be called from inside event handling on the posting thread");
        };
        match &state.current {
            Some((current, _)) if !current.is_viewed_at(event.addr()) => {
                Err("only the currently handled event may be canceled")
            }
            Some((_, ThreadMode::Posting)) => {
                state.canceled = true;
                Ok(())
            }
            Some(_) => Err("only posting-mode subscribers may cancel the incoming event"),
            None => Err("may only be called from inside event handling on the posting thread"),
        }
    })
}
