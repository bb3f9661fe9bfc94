//! # Event bus configuration.
//!
//! Provides [`Config`], the centralized settings of one [`EventBus`](crate::EventBus).
//!
//! Config is used in two ways:
//! 1. **Bus creation**: `EventBus::builder(config).build()`
//! 2. **Scheduler sizing**: the default executor, the ordered poster budget and
//!    the background worker read their limits from it.
//!
//! ## Sentinel values
//! - `async_max_threads = 0` → default upper bound (512 threads)

use std::time::Duration;

const DEFAULT_ASYNC_MAX_THREADS: usize = 512;

/// Configuration of an event bus.
///
/// Defines:
/// - **Matching**: whether events also reach subscribers of their supertypes
/// - **Resolution**: strictness and index usage of the subscriber method resolver
/// - **Scheduling**: main-context budget, background idle timeout, async pool size
/// - **Bus events**: which of the bus's own events are posted and what is logged
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Deliver events to subscribers of every supertype and interface of the
    /// posted type, not only of the exact type.
    pub event_inheritance: bool,

    /// Fail registration on marked members with the wrong shape instead of
    /// skipping them.
    pub strict_method_verification: bool,

    /// Resolve every class from its metadata even when an index knows it.
    pub ignore_generated_index: bool,

    /// How long one drain job of the ordered poster may run on the main context
    /// before it yields and re-arms itself.
    ///
    /// Checked after each delivery; a single slow subscriber can overrun it.
    pub main_thread_budget: Duration,

    /// How long the background worker waits for more work before exiting.
    pub background_poll_timeout: Duration,

    /// Upper bound of threads in the owned async pool.
    ///
    /// - `0` = default (512)
    /// - only used when no tokio runtime is current at build time
    pub async_max_threads: usize,

    /// Idle lifetime of a thread in the owned async pool.
    pub async_keep_alive: Duration,

    /// Pending-post records kept for reuse.
    pub pending_post_pool_capacity: usize,

    /// Post a [`NoSubscriberEvent`](crate::NoSubscriberEvent) when nothing matched.
    pub send_no_subscriber_event: bool,

    /// Post a [`SubscriberExceptionEvent`](crate::SubscriberExceptionEvent) when a
    /// subscriber fails.
    pub send_subscriber_exception_event: bool,

    /// Emit a debug log line when an event had no subscribers.
    pub log_no_subscriber_messages: bool,

    /// Report subscriber failures to the error sink even when a
    /// `SubscriberExceptionEvent` was posted for them.
    pub log_subscriber_exceptions: bool,
}

impl Config {
    /// Returns the async pool bound with the sentinel resolved.
    #[inline]
    pub fn async_thread_limit(&self) -> usize {
        if self.async_max_threads == 0 {
            DEFAULT_ASYNC_MAX_THREADS
        } else {
            self.async_max_threads
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `event_inheritance = true`
    /// - `strict_method_verification = false`
    /// - `ignore_generated_index = false`
    /// - `main_thread_budget = 10ms`
    /// - `background_poll_timeout = 1s`
    /// - `async_max_threads = 0` (512)
    /// - `async_keep_alive = 10s`
    /// - `pending_post_pool_capacity = 1024`
    /// - every bus event posted, every message logged
    fn default() -> Self {
        Self {
            event_inheritance: true,
            strict_method_verification: false,
            ignore_generated_index: false,
            main_thread_budget: Duration::from_millis(10),
            background_poll_timeout: Duration::from_secs(1),
            async_max_threads: 0,
            async_keep_alive: Duration::from_secs(10),
            pending_post_pool_capacity: 1024,
            send_no_subscriber_event: true,
            send_subscriber_exception_event: true,
            log_no_subscriber_messages: true,
            log_subscriber_exceptions: true,
        }
    }
}
