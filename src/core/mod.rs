//! Bus core: registration, posting and orchestration.
//!
//! The public API from this module is [`EventBus`], its [`EventBusBuilder`],
//! the [`Config`] and the [`ErrorSink`] seam.
//!
//! ## Wiring
//! ```text
//!                     ┌──────────────────────── EventBus ─────────────────────────┐
//! register(&Arc<S>) ─►│ finder ─► registry ─► sticky replay                       │
//! post(ev) ──────────►│ posting (thread queue) ─► hierarchy ─► registry snapshot  │
//!                     │   ├─► invoke (Posting / inline)                           │
//!                     │   ├─► OrderedPoster ─► MainThreadSupport                  │
//!                     │   ├─► BackgroundPoster ─► Executor (one worker)           │
//!                     │   └─► AsyncPoster ─► Executor (job per delivery)          │
//! failures ──────────►│ SubscriberExceptionEvent / ErrorSink                      │
//!                     └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal modules:
//! - [`registry`]: event type → ordered subscriptions, subscriber → event types;
//! - [`sticky`]: latest sticky event per type;
//! - [`posting`]: per-thread posting queue and cancellation state;
//! - [`bus`]: the dispatch engine;
//! - [`builder`]: assembly of collaborators.

mod builder;
mod bus;
mod config;
mod posting;
mod registry;
mod sink;
mod sticky;

pub use builder::EventBusBuilder;
pub use bus::EventBus;
pub use config::Config;
pub use sink::{ErrorSink, LogSink};
