//! # Subscription registry.
//!
//! Two tables under one lock:
//! - event type → subscriptions, ordered by priority;
//! - subscriber → the event types it subscribed to (for unregistration).
//!
//! ```text
//! subscribe(id, methods)  ──► for each method: insert into by_type[method.event_type]
//!                               position = first entry with strictly lower priority
//! unsubscribe(id)         ──► by_subscriber.remove(id) ─► deactivate + remove entries
//! subscriptions_for(ty)   ──► Arc snapshot (no lock held while delivering)
//! ```
//!
//! ## Rules
//! - Lists are copy-on-write: a snapshot taken by a poster is never mutated.
//! - Per-type order is non-increasing priority; equal priorities keep
//!   registration order.
//! - A subscriber id appears at most once in `by_subscriber`.
//! - A removed subscription is deactivated before it leaves the table, so queued
//!   deliveries for it are dropped.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::EventBusError;
use crate::events::EventType;
use crate::subscribers::{SubscriberId, SubscriberMethod, Subscription};

pub(crate) type SubscriptionList = Arc<Vec<Arc<Subscription>>>;

#[derive(Default)]
struct Tables {
    by_type: HashMap<EventType, SubscriptionList>,
    by_subscriber: HashMap<SubscriberId, Vec<EventType>>,
}

#[derive(Default)]
pub(crate) struct Registry {
    tables: Mutex<Tables>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds one subscription per method and returns them in method order.
    pub(crate) fn subscribe(
        &self,
        id: SubscriberId,
        class: &'static str,
        subscriber: Arc<dyn Any + Send + Sync>,
        methods: &[SubscriberMethod],
    ) -> Result<Vec<Arc<Subscription>>, EventBusError> {
        let mut tables = self.tables.lock();
        if tables.by_subscriber.contains_key(&id) {
            return Err(EventBusError::AlreadyRegistered { class });
        }

        let mut added = Vec::with_capacity(methods.len());
        let mut types = Vec::with_capacity(methods.len());
        for method in methods {
            let subscription = Arc::new(Subscription::new(
                id,
                Arc::clone(&subscriber),
                method.clone(),
            ));
            let list = tables.by_type.entry(method.event_type()).or_default();
            let list = Arc::make_mut(list);
            let at = list
                .iter()
                .position(|s| s.method().priority() < method.priority())
                .unwrap_or(list.len());
            list.insert(at, Arc::clone(&subscription));

            if !types.contains(&method.event_type()) {
                types.push(method.event_type());
            }
            added.push(subscription);
        }
        tables.by_subscriber.insert(id, types);
        Ok(added)
    }

    /// Removes every subscription of `id`. Returns `false` if it was not registered.
    pub(crate) fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut tables = self.tables.lock();
        let Some(types) = tables.by_subscriber.remove(&id) else {
            return false;
        };
        for ty in types {
            let Some(list) = tables.by_type.get_mut(&ty) else {
                continue;
            };
            Arc::make_mut(list).retain(|s| {
                if s.subscriber_id() == id {
                    s.deactivate();
                    false
                } else {
                    true
                }
            });
            if list.is_empty() {
                tables.by_type.remove(&ty);
            }
        }
        true
    }

    pub(crate) fn subscriptions_for(&self, ty: EventType) -> Option<SubscriptionList> {
        self.tables.lock().by_type.get(&ty).cloned()
    }

    pub(crate) fn has_subscribers(&self, ty: EventType) -> bool {
        self.tables
            .lock()
            .by_type
            .get(&ty)
            .is_some_and(|list| !list.is_empty())
    }

    pub(crate) fn is_registered(&self, id: SubscriberId) -> bool {
        self.tables.lock().by_subscriber.contains_key(&id)
    }
}
