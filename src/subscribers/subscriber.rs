//! # Subscriber trait
//!
//! `Subscriber` is the extension point for plugging event handlers into the bus.
//! A subscriber type describes its class once, through [`Subscriber::class`];
//! the bus resolves that description into subscriber methods the first time an
//! instance of the type registers and caches the result per type.
//!
//! ## Contract
//! - `class()` must be deterministic: it is called on cache misses only, and the
//!   cached resolution is reused for every later instance.
//! - Instances are registered as `Arc<Self>`; the bus holds a strong reference
//!   until [`EventBus::unregister`](crate::EventBus::unregister).
//! - Handlers return `anyhow::Result<()>`. An `Err` or a panic is isolated and
//!   reported; it never reaches the poster.
//!
//! ## Example (skeleton)
//! ```rust
//! use postbus::{event_type, ClassMeta, Subscribe, Subscriber, ThreadMode};
//!
//! struct Saved { id: u64 }
//! event_type!(Saved);
//!
//! struct Audit;
//!
//! impl Subscriber for Audit {
//!     fn class() -> ClassMeta {
//!         ClassMeta::builder::<Self>()
//!             .subscribe(
//!                 "on_saved",
//!                 Subscribe::new().with_thread_mode(ThreadMode::Background),
//!                 |_: &Self, ev: &Saved| {
//!                     // write audit record for ev.id ...
//!                     let _ = ev.id;
//!                     Ok(())
//!                 },
//!             )
//!             .build()
//!     }
//! }
//! ```

use std::any::Any;

use super::meta::ClassMeta;

/// Contract for subscriber types.
pub trait Subscriber: Any + Send + Sync {
    /// Describes the members of this class (and the superclass it embeds).
    fn class() -> ClassMeta
    where
        Self: Sized;
}
