//! # Async poster: one executor job per delivery.
//!
//! Every `Async` delivery is queued and a job that runs exactly one queued
//! delivery is handed to the executor. Jobs run concurrently, so deliveries
//! carry no ordering guarantee. A job dropped unrun takes one queued delivery
//! with it, keeping jobs and queued posts in step.

use std::sync::Arc;

use super::executor::Executor;
use super::{Deliver, submit};
use super::queue::{PendingPost, PendingPostQueue};
use crate::error::EventBusError;

pub(crate) struct AsyncPoster {
    queue: PendingPostQueue,
    executor: Arc<dyn Executor>,
}

impl AsyncPoster {
    pub(crate) fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            queue: PendingPostQueue::new(),
            executor,
        }
    }

    pub(crate) fn enqueue<D: Deliver>(
        self: &Arc<Self>,
        bus: &Arc<D>,
        post: Box<PendingPost>,
    ) -> Result<(), EventBusError> {
        self.queue.enqueue(post);

        let poster = Arc::clone(self);
        let job_bus = Arc::clone(bus);
        let lost = Arc::clone(self);
        let lost_bus = Arc::clone(bus);
        submit(
            &*self.executor,
            bus,
            "async",
            move || match poster.queue.poll() {
                Some(post) => job_bus.invoke_pending(post),
                None => job_bus.report(&EventBusError::Scheduler {
                    context: "async",
                    source: crate::error::ScheduleError::Internal("no pending post available"),
                }),
            },
            move || {
                if let Some(post) = lost.queue.poll() {
                    lost_bus.discard_pending(post);
                }
            },
        )
    }
}
