//! # Sticky event store.
//!
//! Keeps the most recent sticky event per concrete event type. A sticky post
//! replaces the previous value of its type; registration of a sticky subscriber
//! method replays the stored value.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::{Event, EventType};

#[derive(Default)]
pub(crate) struct StickyStore {
    events: Mutex<HashMap<EventType, Arc<dyn Event>>>,
}

impl StickyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, event: Arc<dyn Event>) {
        self.events.lock().insert(event.event_type(), event);
    }

    pub(crate) fn get(&self, ty: EventType) -> Option<Arc<dyn Event>> {
        self.events.lock().get(&ty).cloned()
    }

    pub(crate) fn remove(&self, ty: EventType) -> Option<Arc<dyn Event>> {
        self.events.lock().remove(&ty)
    }

    /// Removes `event` only if it is still the stored instance of its type.
    pub(crate) fn remove_instance(&self, event: &Arc<dyn Event>) -> bool {
        let mut events = self.events.lock();
        let ty = event.event_type();
        match events.get(&ty) {
            Some(stored) if stored.addr() == event.addr() => {
                events.remove(&ty);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear(&self) {
        self.events.lock().clear();
    }

    /// Copy of every stored entry, for replay outside the lock.
    pub(crate) fn snapshot(&self) -> Vec<(EventType, Arc<dyn Event>)> {
        self.events
            .lock()
            .iter()
            .map(|(ty, event)| (*ty, Arc::clone(event)))
            .collect()
    }
}
