//! Events: types, hierarchy resolution and the bus's own events.
//!
//! ## Contents
//! - [`Event`], [`EventType`], [`Hierarchy`], [`Supertype`] the runtime type model
//! - [`TypeHierarchy`] cached resolver of the types an event matches
//! - [`NoSubscriberEvent`], [`SubscriberExceptionEvent`] events posted by the bus
//!
//! See `core/mod.rs` for the system-level wiring diagram.

mod event;
mod hierarchy;
mod system;

pub use event::{Event, EventType, Hierarchy, Supertype, Upcast};
pub use hierarchy::TypeHierarchy;
pub use system::{NoSubscriberEvent, SubscriberExceptionEvent};
