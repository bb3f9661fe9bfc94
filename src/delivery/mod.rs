//! Delivery: the schedulers behind the non-posting thread modes.
//!
//! ## Contents
//! - [`queue`]: pooled pending posts and the FIFO the posters share
//! - [`ordered`]: `Main`/`MainOrdered` poster on a [`MainThreadSupport`]
//! - [`main_loop`]: [`MainLoop`], a dedicated thread usable as main context
//! - [`background`]: single sequential worker for `Background`
//! - [`pool`]: one executor job per `Async` delivery
//! - [`executor`]: [`Executor`] seam and the tokio-backed default
//!
//! Posters never call subscribers themselves; they hand pending posts back to
//! the bus through [`Deliver`].
//!
//! ## Rules
//! - Every job a poster hands to an [`Executor`] goes through [`submit`]. A job
//!   the executor drops without running releases what it held: synchronously
//!   that is a `Scheduler` error for the caller, later it reaches the error sink.

mod background;
mod executor;
mod main_loop;
mod ordered;
mod pool;
mod queue;

pub(crate) use background::BackgroundPoster;
pub use executor::{Executor, Job, TokioExecutor};
pub use main_loop::MainLoop;
pub(crate) use ordered::OrderedPoster;
pub use ordered::MainThreadSupport;
pub(crate) use pool::AsyncPoster;
pub(crate) use queue::{PendingPost, PendingPostPool};

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{EventBusError, ScheduleError};

/// What posters need from the bus.
pub(crate) trait Deliver: Send + Sync + 'static {
    /// Invokes the delivery held by `post` and returns the record to the pool.
    fn invoke_pending(self: &Arc<Self>, post: Box<PendingPost>);

    /// Returns a record to the pool without invoking it.
    fn discard_pending(&self, post: Box<PendingPost>);

    /// Reports a failure nobody can return to a caller.
    fn report(&self, error: &EventBusError);
}

const SUBMITTING: u8 = 0;
const ACCEPTED: u8 = 1;
const LOST: u8 = 2;

/// Hands `body` to `executor` as one job; `on_lost` runs if the job is dropped unrun.
pub(crate) fn submit<D, B, L>(
    executor: &dyn Executor,
    bus: &Arc<D>,
    context: &'static str,
    body: B,
    on_lost: L,
) -> Result<(), EventBusError>
where
    D: Deliver,
    B: FnOnce() + Send + 'static,
    L: FnOnce() + Send + 'static,
{
    let phase = Arc::new(AtomicU8::new(SUBMITTING));
    let ticket = Ticket {
        phase: Arc::clone(&phase),
        bus: Arc::clone(bus),
        context,
        on_lost: Some(on_lost),
    };
    let job: Job = Box::new(move || {
        let mut ticket = ticket;
        ticket.on_lost = None;
        body();
    });

    executor
        .execute(job)
        .map_err(|source| EventBusError::Scheduler { context, source })?;
    // an executor whose runtime is gone may accept the job and drop it in place
    match phase.compare_exchange(SUBMITTING, ACCEPTED, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => Ok(()),
        Err(_) => Err(EventBusError::Scheduler {
            context,
            source: ScheduleError::Closed,
        }),
    }
}

struct Ticket<D: Deliver, L: FnOnce()> {
    phase: Arc<AtomicU8>,
    bus: Arc<D>,
    context: &'static str,
    on_lost: Option<L>,
}

impl<D: Deliver, L: FnOnce()> Drop for Ticket<D, L> {
    fn drop(&mut self) {
        let Some(on_lost) = self.on_lost.take() else {
            return;
        };
        on_lost();
        if self.phase.swap(LOST, Ordering::AcqRel) == ACCEPTED {
            self.bus.report(&EventBusError::Scheduler {
                context: self.context,
                source: ScheduleError::Internal("job dropped by the executor before it ran"),
            });
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::any::Any;
    use std::thread::JoinHandle;
    use std::time::{Duration, Instant};

    use parking_lot::{Condvar, Mutex};

    use super::*;
    use crate::error::ScheduleError;
    use crate::event_type;
    use crate::events::{Event, EventType};
    use crate::subscribers::{ClassId, Subscribe, SubscriberId, SubscriberMethod, Subscription};

    pub(crate) struct Numbered(pub(crate) u32);
    event_type!(Numbered);

    /// Records the numbers of delivered [`Numbered`] events.
    pub(crate) struct RecordingBus {
        pool: PendingPostPool,
        subscription: Arc<Subscription>,
        delivered: Mutex<Vec<u32>>,
        changed: Condvar,
        pub(crate) reported: Mutex<Vec<EventBusError>>,
    }

    impl RecordingBus {
        pub(crate) fn new() -> Arc<Self> {
            let subscriber = Arc::new(());
            let method = SubscriberMethod::new(
                ClassId::of::<()>(),
                "record",
                EventType::of::<Numbered>(),
                Subscribe::new(),
                Arc::new(|_: &dyn Any, _: &dyn Event| -> anyhow::Result<()> { Ok(()) }),
            );
            Arc::new(Self {
                pool: PendingPostPool::new(16),
                subscription: Arc::new(Subscription::new(
                    SubscriberId::of(&subscriber),
                    subscriber,
                    method,
                )),
                delivered: Mutex::new(Vec::new()),
                changed: Condvar::new(),
                reported: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn delivered(&self) -> Vec<u32> {
            self.delivered.lock().clone()
        }

        /// Waits until `count` deliveries were recorded.
        pub(crate) fn wait_for(&self, count: usize, max_wait: Duration) -> bool {
            let deadline = Instant::now() + max_wait;
            let mut delivered = self.delivered.lock();
            while delivered.len() < count {
                if self.changed.wait_until(&mut delivered, deadline).timed_out() {
                    return delivered.len() >= count;
                }
            }
            true
        }
    }

    impl Deliver for RecordingBus {
        fn invoke_pending(self: &Arc<Self>, mut post: Box<PendingPost>) {
            let taken = post.take();
            self.pool.release(post);
            if let Some((_, event)) = taken {
                if let Some(n) = event.downcast_ref::<Numbered>() {
                    self.delivered.lock().push(n.0);
                    self.changed.notify_all();
                }
            }
        }

        fn discard_pending(&self, post: Box<PendingPost>) {
            self.pool.release(post);
        }

        fn report(&self, error: &EventBusError) {
            self.reported.lock().push(error.clone());
        }
    }

    /// A pending post carrying `Numbered(n)`.
    pub(crate) fn post(bus: &Arc<RecordingBus>, n: u32) -> Box<PendingPost> {
        bus.pool
            .obtain(Arc::clone(&bus.subscription), Arc::new(Numbered(n)))
    }

    /// Runs each job on a fresh thread and keeps the handles.
    #[derive(Default)]
    pub(crate) struct ThreadExecutor {
        handles: Mutex<Vec<JoinHandle<()>>>,
        started: Mutex<usize>,
    }

    impl ThreadExecutor {
        pub(crate) fn started(&self) -> usize {
            *self.started.lock()
        }

        pub(crate) fn join_all(&self) {
            let handles: Vec<_> = self.handles.lock().drain(..).collect();
            for handle in handles {
                handle.join().ok();
            }
        }
    }

    impl Executor for ThreadExecutor {
        fn execute(&self, job: Job) -> Result<(), ScheduleError> {
            *self.started.lock() += 1;
            self.handles.lock().push(std::thread::spawn(job));
            Ok(())
        }
    }

    /// Refuses every job.
    pub(crate) struct RefusingExecutor;

    impl Executor for RefusingExecutor {
        fn execute(&self, _job: Job) -> Result<(), ScheduleError> {
            Err(ScheduleError::Closed)
        }
    }

    /// Accepts every job and drops it on the spot, like a runtime that shut down.
    pub(crate) struct DroppingExecutor;

    impl Executor for DroppingExecutor {
        fn execute(&self, job: Job) -> Result<(), ScheduleError> {
            drop(job);
            Ok(())
        }
    }

    /// Accepts jobs and keeps them until [`ShelvingExecutor::discard`] drops them unrun.
    #[derive(Default)]
    pub(crate) struct ShelvingExecutor {
        shelf: Mutex<Vec<Job>>,
    }

    impl ShelvingExecutor {
        pub(crate) fn discard(&self) {
            let jobs: Vec<Job> = self.shelf.lock().drain(..).collect();
            drop(jobs);
        }
    }

    impl Executor for ShelvingExecutor {
        fn execute(&self, job: Job) -> Result<(), ScheduleError> {
            self.shelf.lock().push(job);
            Ok(())
        }
    }
}
