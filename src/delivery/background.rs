//! # Background poster: one sequential worker.
//!
//! `Background` deliveries posted from any thread other than the worker itself
//! are queued here and run by a single worker job, one at a time, in posting
//! order. The worker is started on demand and exits after the queue stayed empty
//! for `poll_timeout`.
//!
//! ```text
//! enqueue ─► queue ─► running? no ─► running = true ─► executor.execute(run)
//!
//! run:
//!   thread = current
//!   loop { poll_timeout ─► invoke }
//!   timed out ─► lock, re-poll ─► empty ─► running = false, thread = None
//!
//! job dropped unrun ─► lock, discard queue ─► running = false
//! ```

use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;

use parking_lot::Mutex;

use super::executor::Executor;
use super::{Deliver, submit};
use super::queue::{PendingPost, PendingPostQueue};
use crate::error::EventBusError;

#[derive(Default)]
struct WorkerState {
    running: bool,
    thread: Option<ThreadId>,
}

pub(crate) struct BackgroundPoster {
    queue: PendingPostQueue,
    state: Mutex<WorkerState>,
    poll_timeout: Duration,
    executor: Arc<dyn Executor>,
}

impl BackgroundPoster {
    pub(crate) fn new(executor: Arc<dyn Executor>, poll_timeout: Duration) -> Self {
        Self {
            queue: PendingPostQueue::new(),
            state: Mutex::new(WorkerState::default()),
            poll_timeout,
            executor,
        }
    }

    /// Whether the calling thread is the running worker.
    pub(crate) fn is_worker_thread(&self) -> bool {
        self.state.lock().thread == Some(std::thread::current().id())
    }

    pub(crate) fn enqueue<D: Deliver>(
        self: &Arc<Self>,
        bus: &Arc<D>,
        post: Box<PendingPost>,
    ) -> Result<(), EventBusError> {
        {
            let mut state = self.state.lock();
            self.queue.enqueue(post);
            if state.running {
                return Ok(());
            }
            state.running = true;
        }

        let poster = Arc::clone(self);
        let worker_bus = Arc::clone(bus);
        let lost = Arc::clone(self);
        let lost_bus = Arc::clone(bus);
        submit(
            &*self.executor,
            bus,
            "background",
            move || poster.run(&worker_bus),
            move || lost.abandon(&*lost_bus),
        )
    }

    /// Frees the worker slot of a job that never ran; its queued posts are dropped.
    fn abandon<D: Deliver>(&self, bus: &D) {
        let mut state = self.state.lock();
        let mut dropped = 0usize;
        while let Some(post) = self.queue.poll() {
            bus.discard_pending(post);
            dropped += 1;
        }
        state.running = false;
        state.thread = None;
        tracing::debug!(dropped, "background worker job was not run");
    }

    fn run<D: Deliver>(&self, bus: &Arc<D>) {
        self.state.lock().thread = Some(std::thread::current().id());
        loop {
            let post = match self.queue.poll_timeout(self.poll_timeout) {
                Some(post) => post,
                None => {
                    let mut state = self.state.lock();
                    match self.queue.poll() {
                        Some(post) => post,
                        None => {
                            state.running = false;
                            state.thread = None;
                            return;
                        }
                    }
                }
            };
            bus.invoke_pending(post);
        }
    }
}
