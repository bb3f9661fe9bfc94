//! # Ordered poster for the main context.
//!
//! Deliveries for `Main` (from other threads) and `MainOrdered` subscriber
//! methods are queued here and drained on the main context, in posting order.
//!
//! ```text
//! enqueue ─► queue ─► idle? ─► active = true ─► main.schedule(drain)
//!
//! drain (on main):
//!   loop { poll ─► invoke ─► budget spent? ─► main.schedule(drain); return }
//!   empty? ─► lock, re-poll ─► still empty ─► active = false; return
//! ```
//!
//! ## Rules
//! - At most one drain job is scheduled or running at a time (`active`).
//! - The time budget is cooperative: measured after each invocation.
//! - Lock order is state → queue; no lock is held across an invocation.
//! - A refused wake-up on `enqueue` is returned as a `Scheduler` error; a refused
//!   re-arm inside a drain is reported to the error sink.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::Deliver;
use super::executor::Job;
use super::queue::{PendingPost, PendingPostQueue};
use crate::error::{EventBusError, ScheduleError};

/// The host's main execution context.
///
/// Implement this to deliver `Main`/`MainOrdered` events on a UI thread or an
/// event loop. [`MainLoop`](crate::MainLoop) is a ready-made implementation.
pub trait MainThreadSupport: Send + Sync {
    /// Whether the calling thread is the main context.
    fn is_main_thread(&self) -> bool;

    /// Runs `job` on the main context, after the jobs scheduled before it.
    fn schedule(&self, job: Job) -> Result<(), ScheduleError>;
}

pub(crate) struct OrderedPoster {
    queue: PendingPostQueue,
    active: Mutex<bool>,
    budget: Duration,
    main: Arc<dyn MainThreadSupport>,
}

impl OrderedPoster {
    pub(crate) fn new(main: Arc<dyn MainThreadSupport>, budget: Duration) -> Self {
        Self {
            queue: PendingPostQueue::new(),
            active: Mutex::new(false),
            budget,
            main,
        }
    }

    pub(crate) fn is_main_thread(&self) -> bool {
        self.main.is_main_thread()
    }

    pub(crate) fn enqueue<D: Deliver>(
        self: &Arc<Self>,
        bus: &Arc<D>,
        post: Box<PendingPost>,
    ) -> Result<(), EventBusError> {
        {
            let mut active = self.active.lock();
            self.queue.enqueue(post);
            if *active {
                return Ok(());
            }
            *active = true;
        }

        if let Err(source) = self.schedule_drain(bus) {
            *self.active.lock() = false;
            return Err(EventBusError::Scheduler {
                context: "main",
                source,
            });
        }
        Ok(())
    }

    fn schedule_drain<D: Deliver>(self: &Arc<Self>, bus: &Arc<D>) -> Result<(), ScheduleError> {
        let poster = Arc::clone(self);
        let bus = Arc::clone(bus);
        self.main.schedule(Box::new(move || poster.drain(&bus)))
    }

    fn drain<D: Deliver>(self: &Arc<Self>, bus: &Arc<D>) {
        let started = Instant::now();
        loop {
            let post = match self.queue.poll() {
                Some(post) => post,
                None => {
                    let mut active = self.active.lock();
                    match self.queue.poll() {
                        Some(post) => post,
                        None => {
                            *active = false;
                            return;
                        }
                    }
                }
            };
            bus.invoke_pending(post);

            if started.elapsed() >= self.budget {
                if let Err(source) = self.schedule_drain(bus) {
                    *self.active.lock() = false;
                    bus.report(&EventBusError::Scheduler {
                        context: "main",
                        source,
                    });
                }
                return;
            }
        }
    }
}
