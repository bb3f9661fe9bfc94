//! # Events posted by the bus itself.
//!
//! - [`NoSubscriberEvent`]: an event was posted but nobody was subscribed to it
//!   (or to any of its supertypes).
//! - [`SubscriberExceptionEvent`]: a subscriber method failed while handling an
//!   event.
//!
//! Neither of them ever triggers a [`NoSubscriberEvent`] of its own, and a
//! failure while handling a [`SubscriberExceptionEvent`] is only reported to the
//! error sink.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::event::{Event, EventType};
use crate::error::EventBusError;

/// Posted when no subscriber matched a posted event.
#[derive(Clone)]
pub struct NoSubscriberEvent {
    /// The event that had no subscribers.
    pub original_event: Arc<dyn Event>,
}

/// Posted when a subscriber method failed.
#[derive(Clone)]
pub struct SubscriberExceptionEvent {
    /// The failure, as a [`EventBusError::Delivery`].
    pub error: EventBusError,
    /// The event the subscriber was handling.
    pub causing_event: Arc<dyn Event>,
    /// The subscriber instance that failed.
    pub causing_subscriber: Arc<dyn Any + Send + Sync>,
}

crate::event_type!(NoSubscriberEvent);
crate::event_type!(SubscriberExceptionEvent);

impl NoSubscriberEvent {
    pub(crate) fn is_system(ty: EventType) -> bool {
        ty == EventType::of::<NoSubscriberEvent>() || ty == EventType::of::<SubscriberExceptionEvent>()
    }
}

impl SubscriberExceptionEvent {
    /// Downcasts the failing subscriber to its concrete type.
    pub fn subscriber<S: Any + Send + Sync>(&self) -> Option<&S> {
        self.causing_subscriber.downcast_ref::<S>()
    }
}

impl fmt::Debug for NoSubscriberEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoSubscriberEvent")
            .field("original_event", &self.original_event.event_type())
            .finish()
    }
}

impl fmt::Debug for SubscriberExceptionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberExceptionEvent")
            .field("error", &self.error)
            .field("causing_event", &self.causing_event.event_type())
            .finish_non_exhaustive()
    }
}
