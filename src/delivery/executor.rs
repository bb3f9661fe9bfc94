//! # Executor: where background and async deliveries run.
//!
//! [`Executor`] is the seam between the bus and a thread pool. The default
//! [`TokioExecutor`] runs every job through `spawn_blocking`:
//!
//! - on the tokio runtime that was current when the bus was built, if any;
//! - otherwise on an owned runtime, built on first use and sized from
//!   [`Config::async_max_threads`](crate::Config::async_max_threads) and
//!   [`Config::async_keep_alive`](crate::Config::async_keep_alive).
//!
//! A runtime that shut down drops blocking tasks without running them. The
//! executor notices when that happens during `spawn_blocking` and moves the job
//! to the owned runtime, or reports [`ScheduleError::Closed`] when it was pinned
//! to a handle with [`TokioExecutor::with_handle`].
//!
//! Jobs are synchronous closures: subscriber methods are plain functions, so a
//! blocking pool is the right home for them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};

use crate::error::ScheduleError;

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs on some pool of threads.
pub trait Executor: Send + Sync {
    /// Starts `job` eventually, on any thread.
    fn execute(&self, job: Job) -> Result<(), ScheduleError>;
}

/// [`Executor`] backed by tokio's blocking pool.
pub struct TokioExecutor {
    ambient: Mutex<Option<Handle>>,
    pinned: bool,
    owned: Mutex<Option<Runtime>>,
    max_threads: usize,
    keep_alive: Duration,
}

impl TokioExecutor {
    /// Uses the current tokio runtime if there is one, an owned runtime otherwise.
    pub fn new(max_threads: usize, keep_alive: Duration) -> Self {
        Self {
            ambient: Mutex::new(Handle::try_current().ok()),
            pinned: false,
            owned: Mutex::new(None),
            max_threads,
            keep_alive,
        }
    }

    /// Always runs jobs on `handle`'s runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            ambient: Mutex::new(Some(handle)),
            pinned: true,
            owned: Mutex::new(None),
            max_threads: 0,
            keep_alive: Duration::ZERO,
        }
    }

    fn build_runtime(&self) -> Result<Runtime, ScheduleError> {
        Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(self.max_threads.max(1))
            .thread_keep_alive(self.keep_alive)
            .thread_name("postbus-async")
            .build()
            .map_err(|e| ScheduleError::Runtime(e.to_string()))
    }
}

/// Spawns `job` on `handle`; gives it back if the runtime dropped it in place.
fn spawn_on(handle: &Handle, job: Job) -> Result<(), Job> {
    let slot = Arc::new(Mutex::new(Some(job)));
    let task = Arc::clone(&slot);
    drop(handle.spawn_blocking(move || {
        let job = task.lock().take();
        if let Some(job) = job {
            job();
        }
    }));
    match Arc::try_unwrap(slot) {
        Ok(slot) => slot.into_inner().map_or(Ok(()), Err),
        Err(_) => Ok(()),
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) -> Result<(), ScheduleError> {
        let ambient = self.ambient.lock().clone();
        let job = match ambient {
            Some(handle) => match spawn_on(&handle, job) {
                Ok(()) => return Ok(()),
                Err(_) if self.pinned => return Err(ScheduleError::Closed),
                Err(job) => {
                    tracing::debug!("ambient runtime is shut down, switching to an owned one");
                    *self.ambient.lock() = None;
                    job
                }
            },
            None => job,
        };

        let mut owned = self.owned.lock();
        if owned.is_none() {
            *owned = Some(self.build_runtime()?);
            tracing::debug!(max_threads = self.max_threads, "async runtime started");
        }
        match owned.as_ref() {
            Some(runtime) => spawn_on(runtime.handle(), job).map_err(|_| ScheduleError::Closed),
            None => Err(ScheduleError::Internal("owned runtime missing")),
        }
    }
}

impl Drop for TokioExecutor {
    fn drop(&mut self) {
        // may run inside an async context or on one of the runtime's own threads
        if let Some(runtime) = self.owned.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for TokioExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioExecutor")
            .field("ambient", &self.ambient.lock().is_some())
            .field("pinned", &self.pinned)
            .field("owned", &self.owned.lock().is_some())
            .field("max_threads", &self.max_threads)
            .finish()
    }
}
