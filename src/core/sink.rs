//! # Error sink.
//!
//! Failures that happen away from any caller (a subscriber failing on a worker
//! thread, a drain job that cannot re-arm) end up in an [`ErrorSink`]. The
//! default [`LogSink`] writes them to `tracing`.

use crate::error::EventBusError;

/// Receives failures that cannot be returned to a caller.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &EventBusError);
}

/// [`ErrorSink`] that logs at `error` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, error: &EventBusError) {
        tracing::error!(label = error.as_label(), error = %error, "event bus failure");
    }
}
