//! # postbus
//!
//! **postbus** is an in-process publish/subscribe event bus for Rust.
//!
//! Producers post typed event values; subscribers declare methods that accept
//! an event type, together with a delivery thread mode, a priority and an
//! optional sticky flag. The bus resolves, for each posted event, the ordered
//! set of interested subscriptions and delivers the event to each of them in
//! the context its thread mode asks for.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌───────────────┐      ┌───────────────┐      ┌───────────────┐
//!   │  Subscriber   │      │  Subscriber   │      │   Producer    │
//!   │ (ClassMeta)   │      │ (ClassMeta)   │      │  post(event)  │
//!   └──────┬────────┘      └──────┬────────┘      └──────┬────────┘
//!          │ register             │ register             │
//!          ▼                      ▼                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventBus                                                         │
//! │  - SubscriberMethodFinder (class → methods, cached, indexes)      │
//! │  - Registry (event type → subscriptions by priority)              │
//! │  - TypeHierarchy (event type → self, superclasses, interfaces)    │
//! │  - StickyStore (event type → latest sticky event)                 │
//! └──────┬──────────────┬───────────────────┬──────────────────┬──────┘
//!        ▼              ▼                   ▼                  ▼
//!     Posting      OrderedPoster      BackgroundPoster     AsyncPoster
//!     (inline)     (main context,     (one sequential      (job per
//!                   time budget)       worker)              delivery)
//! ```
//!
//! ### Thread modes
//! | Mode          | Delivered on                                                        |
//! |---------------|---------------------------------------------------------------------|
//! | `Posting`     | the posting thread, inline                                          |
//! | `Main`        | the main context; inline when posted from it or when none is set    |
//! | `MainOrdered` | always queued to the main context (inline when none is set)         |
//! | `Background`  | the single background worker; inline when posted from it            |
//! | `Async`       | the async pool, one job per delivery, unordered                     |
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                            |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------------|
//! | **Events**        | Typed events with superclasses and interfaces.                | [`Event`], [`EventType`], [`event_type!`]     |
//! | **Subscribers**   | Describe subscriber classes and their methods.                | [`Subscriber`], [`ClassMeta`], [`Subscribe`]  |
//! | **Indexes**       | Precomputed subscriber methods instead of metadata scans.     | [`SubscriberInfoIndex`], [`SimpleIndex`]      |
//! | **Bus**           | Register, post, sticky events, cancellation.                  | [`EventBus`], [`EventBusBuilder`]             |
//! | **Contexts**      | Main context and worker pools.                                | [`MainThreadSupport`], [`MainLoop`], [`Executor`] |
//! | **Errors**        | Typed errors and an error sink for unreturnable failures.     | [`EventBusError`], [`ErrorSink`]              |
//! | **Configuration** | Centralize bus settings.                                      | [`Config`]                                    |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use postbus::{event_type, ClassMeta, Config, EventBus, Subscribe, Subscriber};
//!
//! struct Base { id: u32 }
//! struct UserSaved { base: Base, name: String }
//! event_type!(Base);
//! event_type!(UserSaved: Base = base);
//!
//! #[derive(Default)]
//! struct Audit { lines: Mutex<Vec<String>> }
//!
//! impl Subscriber for Audit {
//!     fn class() -> ClassMeta {
//!         ClassMeta::builder::<Self>()
//!             .subscribe("on_saved", Subscribe::new().with_priority(1), |me: &Self, ev: &UserSaved| {
//!                 me.lines.lock().push(format!("saved {}", ev.name));
//!                 Ok(())
//!             })
//!             .subscribe("on_any", Subscribe::new(), |me: &Self, ev: &Base| {
//!                 me.lines.lock().push(format!("base {}", ev.id));
//!                 Ok(())
//!             })
//!             .build()
//!     }
//! }
//!
//! # fn main() -> Result<(), postbus::EventBusError> {
//! let bus = EventBus::builder(Config::default()).build();
//! let audit = Arc::new(Audit::default());
//! bus.register(&audit)?;
//!
//! bus.post(UserSaved { base: Base { id: 7 }, name: "ann".into() })?;
//! assert_eq!(*audit.lines.lock(), vec!["saved ann", "base 7"]);
//! # Ok(())
//! # }
//! ```
mod core;
mod delivery;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Config, ErrorSink, EventBus, EventBusBuilder, LogSink};
pub use delivery::{Executor, Job, MainLoop, MainThreadSupport, TokioExecutor};
pub use error::{EventBusError, ScheduleError};
pub use events::{
    Event, EventType, Hierarchy, NoSubscriberEvent, SubscriberExceptionEvent, Supertype,
    TypeHierarchy, Upcast,
};
pub use subscribers::{
    ClassBuilder, ClassId, ClassMeta, Invoker, Member, Modifiers, Projection, SimpleIndex,
    SimpleIndexBuilder, Subscribe, Subscriber, SubscriberInfo, SubscriberInfoIndex,
    SubscriberMethod, SuperClass, ThreadMode, Visibility, projection,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
