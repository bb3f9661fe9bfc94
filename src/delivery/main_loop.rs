//! # A ready-made main context.
//!
//! [`MainLoop`] owns one named thread that runs scheduled jobs one after another.
//! Hosts without a UI thread of their own can use it as the bus's main context.
//!
//! ```text
//! schedule(job) ──► mpsc (unbounded) ──► [main thread] blocking_recv ─► job()
//! ```
//!
//! The thread exits once every sender is gone: drop the loop and the bus that
//! holds it. A panicking job is contained and does not stop the loop.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::ThreadId;

use tokio::sync::mpsc;

use super::executor::Job;
use super::ordered::MainThreadSupport;
use crate::error::ScheduleError;

/// Dedicated thread acting as the main context.
#[derive(Debug)]
pub struct MainLoop {
    tx: mpsc::UnboundedSender<Job>,
    thread: ThreadId,
}

impl MainLoop {
    /// Spawns the loop thread under `name`.
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let handle = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        tracing::error!("main loop job panicked");
                    }
                }
                tracing::debug!("main loop stopped");
            })?;
        Ok(Self {
            tx,
            thread: handle.thread().id(),
        })
    }

    /// Identity of the loop thread.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }
}

impl MainThreadSupport for MainLoop {
    fn is_main_thread(&self) -> bool {
        std::thread::current().id() == self.thread
    }

    fn schedule(&self, job: Job) -> Result<(), ScheduleError> {
        self.tx.send(job).map_err(|_| ScheduleError::Closed)
    }
}
