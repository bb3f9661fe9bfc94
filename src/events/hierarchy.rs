//! # Event type hierarchy resolver.
//!
//! For a concrete event type, [`TypeHierarchy::types_for`] returns every type a
//! subscription may be declared against to still receive that event:
//!
//! ```text
//! Leaf ─► Mid ─► Root            (superclass chain, derivation order)
//!  └─ impl Notice ─► impl Audit  (interfaces, breadth-first, each once)
//!
//! types_for(Leaf) = [Leaf, Mid, Root, Notice, Audit]
//! ```
//!
//! ## Rules
//! - The concrete type is always first.
//! - Superclasses follow in derivation order.
//! - Interfaces of every chain member follow, breadth-first over super-interfaces.
//! - Results are cached per concrete type for the lifetime of the resolver;
//!   type hierarchies never change at runtime. [`clear`](TypeHierarchy::clear)
//!   exists for test isolation only.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;

use super::event::EventType;

/// Cached resolver of event type hierarchies.
#[derive(Default)]
pub struct TypeHierarchy {
    cache: RwLock<HashMap<EventType, Arc<[EventType]>>>,
}

impl TypeHierarchy {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ordered matching types for `ty` (cached).
    pub fn types_for(&self, ty: EventType) -> Arc<[EventType]> {
        if let Some(types) = self.cache.read().get(&ty) {
            return Arc::clone(types);
        }
        let computed: Arc<[EventType]> = Self::compute(ty).into();
        let mut cache = self.cache.write();
        Arc::clone(cache.entry(ty).or_insert(computed))
    }

    /// Returns `true` if an event of type `candidate` matches subscriptions on `target`.
    pub fn matches(&self, target: EventType, candidate: EventType) -> bool {
        target == candidate || self.types_for(candidate).contains(&target)
    }

    /// Drops every cached resolution.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    fn compute(ty: EventType) -> Vec<EventType> {
        let mut chain = vec![ty];
        let mut cursor = ty;
        while let Some(sup) = cursor.superclass() {
            cursor = sup.event_type();
            if chain.contains(&cursor) {
                break;
            }
            chain.push(cursor);
        }

        let mut seen: HashSet<EventType> = chain.iter().copied().collect();
        let mut types = chain.clone();
        for member in &chain {
            let mut pending: VecDeque<EventType> = member.interfaces().into();
            while let Some(iface) = pending.pop_front() {
                if !seen.insert(iface) {
                    continue;
                }
                types.push(iface);
                pending.extend(iface.interfaces());
            }
        }
        types
    }
}
