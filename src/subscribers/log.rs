//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints the events the bus posts about itself to stdout in a
//! human-readable format.
//!
//! ## Output format
//! ```text
//! [no-subscriber] event=app::Ping
//! [subscriber-exception] event=app::Ping err="could not dispatch event app::Ping to app::Screen::on_ping: boom"
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use postbus::{EventBus, LogWriter};
//! let bus = EventBus::new();
//! bus.register(&Arc::new(LogWriter::new()))?;
//! // bus events are now printed to stdout
//! # Ok::<(), postbus::EventBusError>(())
//! ```

use crate::events::{NoSubscriberEvent, SubscriberExceptionEvent};
use crate::subscribers::{ClassMeta, Subscribe, Subscriber};

/// Stdout subscriber for [`NoSubscriberEvent`] and [`SubscriberExceptionEvent`].
///
/// Enabled via the `logging` feature. Not intended for production use;
/// implement a custom [`Subscriber`] for structured logging or metrics.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscriber for LogWriter {
    fn class() -> ClassMeta {
        ClassMeta::builder::<Self>()
            .subscribe(
                "on_no_subscriber",
                Subscribe::new(),
                |_: &Self, e: &NoSubscriberEvent| {
                    println!("[no-subscriber] event={}", e.original_event.event_type());
                    Ok(())
                },
            )
            .subscribe(
                "on_subscriber_exception",
                Subscribe::new(),
                |_: &Self, e: &SubscriberExceptionEvent| {
                    println!(
                        "[subscriber-exception] event={} err={:?}",
                        e.causing_event.event_type(),
                        e.error.to_string()
                    );
                    Ok(())
                },
            )
            .build()
    }
}
