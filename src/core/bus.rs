//! # EventBus: registration, posting and delivery orchestration.
//!
//! [`EventBus`] is a cheap handle (`Arc` inside) over the shared bus state.
//!
//! ## Post flow
//! ```text
//! post(ev) ─► thread queue ─► outermost post on this thread? ─► drain:
//!   for ev in queue:
//!     types = hierarchy(ev) | [type(ev)]
//!     for ty in types:
//!       for sub in registry[ty] (priority order, active only):
//!         Posting      ─► invoke
//!         Main         ─► on main (or no main context)? invoke : ordered poster
//!         MainOrdered  ─► main context? ordered poster : invoke
//!         Background   ─► on worker? invoke : background poster
//!         Async        ─► async poster
//!         canceled?    ─► next ty
//!     nothing matched  ─► debug log + post NoSubscriberEvent
//! ```
//!
//! ## Rules
//! - Subscriber failures (returned errors and panics) never leave `post`; they
//!   become a [`SubscriberExceptionEvent`] and/or go to the error sink.
//! - `post` only fails when a scheduler refuses work. Events queued on the
//!   thread behind the failing one are dropped, not carried into a later post.
//! - Sticky replay on registration runs outside the registry lock.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use super::builder::EventBusBuilder;
use super::config::Config;
use super::posting::{self, DrainGuard};
use super::registry::Registry;
use super::sink::ErrorSink;
use super::sticky::StickyStore;
use crate::delivery::{
    AsyncPoster, BackgroundPoster, Deliver, Executor, MainThreadSupport, OrderedPoster,
    PendingPost, PendingPostPool,
};
use crate::error::EventBusError;
use crate::events::{
    Event, EventType, Hierarchy, NoSubscriberEvent, SubscriberExceptionEvent, TypeHierarchy,
};
use crate::subscribers::{
    SubscriberId, SubscriberInfoIndex, SubscriberMethodFinder, Subscriber, Subscription,
    ThreadMode,
};

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) static GLOBAL: OnceLock<EventBus> = OnceLock::new();

/// Collaborators assembled by [`EventBusBuilder`].
pub(crate) struct Parts {
    pub(crate) cfg: Config,
    pub(crate) indexes: Vec<Arc<dyn SubscriberInfoIndex>>,
    pub(crate) main: Option<Arc<dyn MainThreadSupport>>,
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) sink: Arc<dyn ErrorSink>,
}

pub(crate) struct Shared {
    id: u64,
    cfg: Config,
    registry: Registry,
    sticky: StickyStore,
    hierarchy: TypeHierarchy,
    finder: SubscriberMethodFinder,
    pool: PendingPostPool,
    main_poster: Option<Arc<OrderedPoster>>,
    background: Arc<BackgroundPoster>,
    async_poster: Arc<AsyncPoster>,
    sink: Arc<dyn ErrorSink>,
}

/// In-process publish/subscribe event bus.
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use postbus::{event_type, ClassMeta, EventBus, Subscribe, Subscriber};
///
/// struct Saved(u32);
/// event_type!(Saved);
///
/// #[derive(Default)]
/// struct Counter(AtomicU32);
///
/// impl Subscriber for Counter {
///     fn class() -> ClassMeta {
///         ClassMeta::builder::<Self>()
///             .subscribe("on_saved", Subscribe::new(), |me: &Self, ev: &Saved| {
///                 me.0.fetch_add(ev.0, Ordering::SeqCst);
///                 Ok(())
///             })
///             .build()
///     }
/// }
///
/// # fn main() -> Result<(), postbus::EventBusError> {
/// let bus = EventBus::new();
/// let counter = Arc::new(Counter::default());
/// bus.register(&counter)?;
/// bus.post(Saved(2))?;
/// bus.post(Saved(3))?;
/// assert_eq!(counter.0.load(Ordering::SeqCst), 5);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl EventBus {
    /// Creates a bus with [`Config::default`] and default collaborators.
    pub fn new() -> Self {
        Self::builder(Config::default()).build()
    }

    /// Starts configuring a bus.
    pub fn builder(cfg: Config) -> EventBusBuilder {
        EventBusBuilder::new(cfg)
    }

    /// The process-wide bus, created with defaults on first use unless
    /// [`EventBusBuilder::install_global`] ran before.
    pub fn global() -> &'static EventBus {
        GLOBAL.get_or_init(EventBus::new)
    }

    pub(crate) fn from_parts(parts: Parts) -> Self {
        let Parts {
            cfg,
            indexes,
            main,
            executor,
            sink,
        } = parts;
        let finder = SubscriberMethodFinder::new(
            indexes,
            cfg.strict_method_verification,
            cfg.ignore_generated_index,
        );
        let shared = Shared {
            id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
            registry: Registry::new(),
            sticky: StickyStore::new(),
            hierarchy: TypeHierarchy::new(),
            finder,
            pool: PendingPostPool::new(cfg.pending_post_pool_capacity),
            main_poster: main
                .map(|main| Arc::new(OrderedPoster::new(main, cfg.main_thread_budget))),
            background: Arc::new(BackgroundPoster::new(
                Arc::clone(&executor),
                cfg.background_poll_timeout,
            )),
            async_poster: Arc::new(AsyncPoster::new(executor)),
            sink,
            cfg,
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Registers `subscriber` for the events its subscriber methods accept.
    ///
    /// Sticky subscriber methods immediately receive the stored sticky event of
    /// their type (and, with event inheritance, of every subtype).
    ///
    /// # Errors
    /// Resolution errors of the subscriber class, or
    /// [`EventBusError::AlreadyRegistered`] if this instance is registered.
    pub fn register<S: Subscriber>(&self, subscriber: &Arc<S>) -> Result<(), EventBusError> {
        let shared = &self.shared;
        let class = std::any::type_name::<S>();
        let methods = shared.finder.find::<S>()?;

        let instance: Arc<dyn Any + Send + Sync> = Arc::clone(subscriber) as _;
        let added =
            shared
                .registry
                .subscribe(SubscriberId::of(subscriber), class, instance, &methods)?;
        tracing::debug!(class, methods = added.len(), "subscriber registered");

        for subscription in added.iter().filter(|s| s.method().sticky()) {
            shared.replay_sticky(subscription);
        }
        Ok(())
    }

    /// Removes every subscription of `subscriber`.
    ///
    /// Deliveries already queued for it are dropped. Unknown subscribers are
    /// logged and otherwise ignored.
    pub fn unregister<S: Subscriber>(&self, subscriber: &Arc<S>) {
        let class = std::any::type_name::<S>();
        if self
            .shared
            .registry
            .unsubscribe(SubscriberId::of(subscriber))
        {
            tracing::debug!(class, "subscriber unregistered");
        } else {
            tracing::warn!(class, "subscriber to unregister was not registered before");
        }
    }

    pub fn is_registered<S: Subscriber>(&self, subscriber: &Arc<S>) -> bool {
        self.shared
            .registry
            .is_registered(SubscriberId::of(subscriber))
    }

    /// Posts `event` to every matching subscription.
    ///
    /// # Errors
    /// [`EventBusError::Scheduler`] if a delivery context refused work.
    pub fn post<E: Event>(&self, event: E) -> Result<(), EventBusError> {
        self.post_arc(Arc::new(event))
    }

    /// Posts an already shared event.
    pub fn post_arc(&self, event: Arc<dyn Event>) -> Result<(), EventBusError> {
        self.shared.post(event)
    }

    /// Stores `event` as the sticky value of its type, then posts it.
    pub fn post_sticky<E: Event>(&self, event: E) -> Result<(), EventBusError> {
        self.post_sticky_arc(Arc::new(event))
    }

    pub fn post_sticky_arc(&self, event: Arc<dyn Event>) -> Result<(), EventBusError> {
        self.shared.sticky.insert(Arc::clone(&event));
        self.shared.post(event)
    }

    /// The stored sticky event of type `E`.
    pub fn get_sticky_event<E: Event + Hierarchy>(&self) -> Option<Arc<E>> {
        self.sticky_event(EventType::of::<E>())
            .and_then(|event| event.into_any().downcast::<E>().ok())
    }

    /// The stored sticky event of type `ty`, untyped.
    pub fn sticky_event(&self, ty: EventType) -> Option<Arc<dyn Event>> {
        self.shared.sticky.get(ty)
    }

    /// Removes and returns the stored sticky event of type `E`.
    pub fn remove_sticky_event<E: Event + Hierarchy>(&self) -> Option<Arc<E>> {
        self.shared
            .sticky
            .remove(EventType::of::<E>())
            .and_then(|event| event.into_any().downcast::<E>().ok())
    }

    /// Removes `event` if it still is the stored sticky value of its type.
    pub fn remove_sticky_event_instance(&self, event: &Arc<dyn Event>) -> bool {
        self.shared.sticky.remove_instance(event)
    }

    pub fn remove_all_sticky_events(&self) {
        self.shared.sticky.clear();
    }

    pub fn has_subscriber_for_event<E: Hierarchy>(&self) -> bool {
        self.has_subscriber_for_type(EventType::of::<E>())
    }

    /// Whether posting an event of type `ty` would reach any subscription.
    pub fn has_subscriber_for_type(&self, ty: EventType) -> bool {
        self.shared
            .types_for(ty)
            .iter()
            .any(|t| self.shared.registry.has_subscribers(*t))
    }

    /// Stops delivery of `event` to the remaining subscriptions of the type
    /// being delivered.
    ///
    /// # Errors
    /// [`EventBusError::CancelRejected`] unless called from a `Posting`
    /// subscriber method that is handling `event` right now.
    pub fn cancel_event_delivery(&self, event: &dyn Event) -> Result<(), EventBusError> {
        posting::cancel(self.shared.id, event)
            .map_err(|reason| EventBusError::CancelRejected { reason })
    }

    /// Drops the resolved subscriber methods and event hierarchies.
    pub fn clear_caches(&self) {
        self.shared.finder.clear_cache();
        self.shared.hierarchy.clear();
    }

    pub fn config(&self) -> &Config {
        &self.shared.cfg
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("id", &self.shared.id)
            .field("event_inheritance", &self.shared.cfg.event_inheritance)
            .field("main_context", &self.shared.main_poster.is_some())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn types_for(&self, ty: EventType) -> Arc<[EventType]> {
        if self.cfg.event_inheritance {
            self.hierarchy.types_for(ty)
        } else {
            Arc::from([ty])
        }
    }

    fn is_main_thread(&self) -> bool {
        self.main_poster
            .as_ref()
            .is_none_or(|poster| poster.is_main_thread())
    }

    fn post(self: &Arc<Self>, event: Arc<dyn Event>) -> Result<(), EventBusError> {
        let Some(drain) = posting::enqueue(self.id, event, || self.is_main_thread()) else {
            return Ok(());
        };
        while let Some(event) = drain.next() {
            self.post_single(&drain, event)?;
        }
        Ok(())
    }

    fn post_single(
        self: &Arc<Self>,
        drain: &DrainGuard,
        event: Arc<dyn Event>,
    ) -> Result<(), EventBusError> {
        let ty = event.event_type();
        let mut found = false;
        for target in self.types_for(ty).iter() {
            found |= self.post_for_type(drain, &event, *target)?;
        }
        if found {
            return Ok(());
        }

        if self.cfg.log_no_subscriber_messages {
            tracing::debug!(event_type = ty.name(), "no subscribers registered for event");
        }
        if self.cfg.send_no_subscriber_event && !NoSubscriberEvent::is_system(ty) {
            self.post(Arc::new(NoSubscriberEvent {
                original_event: event,
            }))?;
        }
        Ok(())
    }

    fn post_for_type(
        self: &Arc<Self>,
        drain: &DrainGuard,
        event: &Arc<dyn Event>,
        ty: EventType,
    ) -> Result<bool, EventBusError> {
        let Some(subscriptions) = self.registry.subscriptions_for(ty) else {
            return Ok(false);
        };
        if subscriptions.is_empty() {
            return Ok(false);
        }

        let is_main = drain.is_main();
        for subscription in subscriptions.iter() {
            if !subscription.is_active() {
                continue;
            }
            drain.begin(event, subscription.method().thread_mode());
            let delivered = self.post_to_subscription(subscription, event, is_main);
            let canceled = drain.end();
            delivered?;
            if canceled {
                break;
            }
        }
        Ok(true)
    }

    fn post_to_subscription(
        self: &Arc<Self>,
        subscription: &Arc<Subscription>,
        event: &Arc<dyn Event>,
        is_main: bool,
    ) -> Result<(), EventBusError> {
        match subscription.method().thread_mode() {
            ThreadMode::Posting => self.invoke(subscription, event),
            ThreadMode::Main => match &self.main_poster {
                Some(poster) if !is_main => poster.enqueue(self, self.pending(subscription, event))?,
                _ => self.invoke(subscription, event),
            },
            ThreadMode::MainOrdered => match &self.main_poster {
                Some(poster) => poster.enqueue(self, self.pending(subscription, event))?,
                None => self.invoke(subscription, event),
            },
            ThreadMode::Background => {
                if self.background.is_worker_thread() {
                    self.invoke(subscription, event);
                } else {
                    self.background
                        .enqueue(self, self.pending(subscription, event))?;
                }
            }
            ThreadMode::Async => self
                .async_poster
                .enqueue(self, self.pending(subscription, event))?,
        }
        Ok(())
    }

    fn pending(&self, subscription: &Arc<Subscription>, event: &Arc<dyn Event>) -> Box<PendingPost> {
        self.pool
            .obtain(Arc::clone(subscription), Arc::clone(event))
    }

    fn replay_sticky(self: &Arc<Self>, subscription: &Arc<Subscription>) {
        let target = subscription.method().event_type();
        let matching: Vec<Arc<dyn Event>> = if self.cfg.event_inheritance {
            self.sticky
                .snapshot()
                .into_iter()
                .filter(|(ty, _)| self.hierarchy.matches(target, *ty))
                .map(|(_, event)| event)
                .collect()
        } else {
            self.sticky.get(target).into_iter().collect()
        };

        let is_main = self.is_main_thread();
        for event in matching {
            if let Err(err) = self.post_to_subscription(subscription, &event, is_main) {
                self.sink.report(&err);
            }
        }
    }

    /// Calls the subscriber method, isolating returned errors and panics.
    fn invoke(self: &Arc<Self>, subscription: &Arc<Subscription>, event: &Arc<dyn Event>) {
        let target: &dyn Any = &**subscription.subscriber();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            subscription.method().invoke(target, &**event)
        }));
        let cause = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(panic) => {
                let any = &*panic;
                let info = if let Some(msg) = any.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = any.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                };
                anyhow::anyhow!("subscriber panicked: {info}")
            }
        };

        let error = EventBusError::Delivery {
            event_type: event.event_type().name(),
            method: subscription.method().qualified_name(),
            cause: Arc::new(cause),
        };
        self.handle_failure(subscription, event, error);
    }

    fn handle_failure(
        self: &Arc<Self>,
        subscription: &Arc<Subscription>,
        event: &Arc<dyn Event>,
        error: EventBusError,
    ) {
        if event.is::<SubscriberExceptionEvent>() {
            self.sink.report(&error);
            return;
        }

        let mut posted = false;
        if self.cfg.send_subscriber_exception_event {
            let report = SubscriberExceptionEvent {
                error: error.clone(),
                causing_event: Arc::clone(event),
                causing_subscriber: Arc::clone(subscription.subscriber()),
            };
            match self.post(Arc::new(report)) {
                Ok(()) => posted = true,
                Err(err) => self.sink.report(&err),
            }
        }
        if self.cfg.log_subscriber_exceptions || !posted {
            self.sink.report(&error);
        }
    }
}

impl Deliver for Shared {
    fn invoke_pending(self: &Arc<Self>, mut post: Box<PendingPost>) {
        let taken = post.take();
        self.pool.release(post);
        if let Some((subscription, event)) = taken {
            if subscription.is_active() {
                self.invoke(&subscription, &event);
            }
        }
    }

    fn discard_pending(&self, post: Box<PendingPost>) {
        self.pool.release(post);
    }

    fn report(&self, error: &EventBusError) {
        self.sink.report(error);
    }
}
