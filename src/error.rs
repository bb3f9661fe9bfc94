//! Error types used by the event bus.
//!
//! This module defines two enums:
//!
//! - [`EventBusError`]: everything the bus itself can report: registration
//!   failures (returned from `register`), delivery failures (never returned from
//!   `post`, only routed to the error sink or wrapped in a
//!   [`SubscriberExceptionEvent`](crate::SubscriberExceptionEvent)) and scheduler
//!   failures.
//! - [`ScheduleError`]: the small error returned by the pluggable
//!   [`Executor`](crate::Executor) and [`MainThreadSupport`](crate::MainThreadSupport)
//!   collaborators.
//!
//! Both provide `as_label` for logging.

use std::sync::Arc;

use thiserror::Error;

/// # Errors produced by the event bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Resolution found no subscriber methods on the class or its superclasses.
    #[error("subscriber {class} and its super classes have no public methods with a subscribe marker")]
    NoSubscriberMethods {
        /// Name of the subscriber class.
        class: &'static str,
    },

    /// A marked member has the wrong shape (strict method verification only).
    #[error("invalid subscriber method {method}: {reason}")]
    InvalidSubscriberMethod {
        /// `Class::member` of the offending declaration.
        method: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The same `(name, event type)` key was declared twice on one class level.
    #[error("subscriber method {method} is declared more than once in {class}")]
    DuplicateSubscriberMethod {
        /// Declaring class.
        class: &'static str,
        /// `name(EventType)` key.
        method: String,
    },

    /// The subscriber instance is already registered.
    #[error("subscriber {class} is already registered")]
    AlreadyRegistered {
        /// Name of the subscriber class.
        class: &'static str,
    },

    /// A subscriber method failed (returned an error or panicked).
    #[error("could not dispatch event {event_type} to {method}: {cause}")]
    Delivery {
        /// Concrete type of the event being delivered.
        event_type: &'static str,
        /// `Class::member` of the subscriber method.
        method: String,
        /// The failure raised by the subscriber.
        cause: Arc<anyhow::Error>,
    },

    /// A delivery context refused work; delivery on that path can no longer be guaranteed.
    #[error("could not schedule delivery on {context}: {source}")]
    Scheduler {
        /// Which scheduler failed (`main`, `background`, `async`).
        context: &'static str,
        /// Underlying failure.
        source: ScheduleError,
    },

    /// `cancel_event_delivery` was called outside of a posting-mode handler.
    #[error("event delivery cannot be cancelled: {reason}")]
    CancelRejected {
        /// Why the request was rejected.
        reason: &'static str,
    },

    /// A global bus was already installed.
    #[error("global event bus already exists")]
    GlobalAlreadyInstalled,
}

impl EventBusError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use postbus::EventBusError;
    ///
    /// let err = EventBusError::AlreadyRegistered { class: "Screen" };
    /// assert_eq!(err.as_label(), "already_registered");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EventBusError::NoSubscriberMethods { .. } => "no_subscriber_methods",
            EventBusError::InvalidSubscriberMethod { .. } => "invalid_subscriber_method",
            EventBusError::DuplicateSubscriberMethod { .. } => "duplicate_subscriber_method",
            EventBusError::AlreadyRegistered { .. } => "already_registered",
            EventBusError::Delivery { .. } => "delivery_failed",
            EventBusError::Scheduler { .. } => "scheduler_failed",
            EventBusError::CancelRejected { .. } => "cancel_rejected",
            EventBusError::GlobalAlreadyInstalled => "global_already_installed",
        }
    }

    /// Whether the error was raised while resolving subscriber methods.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            EventBusError::NoSubscriberMethods { .. }
                | EventBusError::InvalidSubscriberMethod { .. }
                | EventBusError::DuplicateSubscriberMethod { .. }
        )
    }
}

/// # Errors returned by delivery collaborators.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The context no longer accepts work (channel closed, loop stopped).
    #[error("context closed")]
    Closed,

    /// The execution runtime could not be started.
    #[error("runtime unavailable: {0}")]
    Runtime(String),

    /// Bookkeeping mismatch inside a scheduler.
    #[error("internal: {0}")]
    Internal(&'static str),
}

impl ScheduleError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ScheduleError::Closed => "schedule_closed",
            ScheduleError::Runtime(_) => "schedule_runtime",
            ScheduleError::Internal(_) => "schedule_internal",
        }
    }
}
