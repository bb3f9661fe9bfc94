//! # Subscriptions
//!
//! A [`Subscription`] is the live pairing of one registered subscriber instance
//! with one resolved [`SubscriberMethod`].
//!
//! ## Rules
//! - `active` is `true` from creation and flips to `false` exactly once, when the
//!   subscriber is unregistered. It never flips back.
//! - Queued deliveries check `active` right before invoking, so a subscriber that
//!   unregistered while posts were in flight is not called afterwards.
//! - Equality: same subscriber instance (allocation address) and equal method.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::method::SubscriberMethod;

/// Identity of a registered subscriber instance: the address of its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

impl SubscriberId {
    pub fn of<S: ?Sized>(subscriber: &Arc<S>) -> Self {
        Self(Arc::as_ptr(subscriber) as *const () as usize)
    }
}

/// One subscriber instance bound to one subscriber method.
pub struct Subscription {
    id: SubscriberId,
    subscriber: Arc<dyn Any + Send + Sync>,
    method: SubscriberMethod,
    active: AtomicBool,
}

impl Subscription {
    pub fn new(
        id: SubscriberId,
        subscriber: Arc<dyn Any + Send + Sync>,
        method: SubscriberMethod,
    ) -> Self {
        Self {
            id,
            subscriber,
            method,
            active: AtomicBool::new(true),
        }
    }

    #[inline]
    pub fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    #[inline]
    pub fn subscriber(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.subscriber
    }

    #[inline]
    pub fn method(&self) -> &SubscriberMethod {
        &self.method
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Marks the subscription inactive; returns `true` only for the call that flipped it.
    pub fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.method == other.method
    }
}

impl Eq for Subscription {}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscriber", &self.id)
            .field("method", &self.method)
            .field("active", &self.is_active())
            .finish()
    }
}
