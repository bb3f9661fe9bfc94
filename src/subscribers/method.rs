//! # Subscriber methods
//!
//! A [`SubscriberMethod`] is one resolved "interest declaration": which event
//! type a method accepts, on which [`ThreadMode`] it wants to be called, its
//! priority and whether it replays sticky events.
//!
//! ## Equality
//! Two methods are equal when `(declaring class, name, event type)` match. The
//! invoker is not part of identity, so the same declaration reached through two
//! different resolutions (index vs. metadata scan, or two subclasses) compares
//! equal, which is what override detection relies on.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::meta::ClassId;
use crate::events::{Event, EventType};

/// Type-erased call of a subscriber method: `(subscriber, event)`.
///
/// The subscriber argument is the instance of the *declaring* class.
pub type Invoker = Arc<dyn Fn(&dyn Any, &dyn Event) -> anyhow::Result<()> + Send + Sync>;

/// Projection from a subclass instance to the superclass instance it embeds.
pub type Projection = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;

/// Wraps a closure into a [`Projection`].
pub fn projection<F>(f: F) -> Projection
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Chains `outer` (concrete → level) with `inner` (level → parent level).
pub(crate) fn compose(outer: Option<&Projection>, inner: &Projection) -> Projection {
    match outer {
        None => Arc::clone(inner),
        Some(outer) => {
            let outer = Arc::clone(outer);
            let inner = Arc::clone(inner);
            projection(move |value| outer(value).and_then(|parent| inner(parent)))
        }
    }
}

/// Which execution context invokes a subscriber method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadMode {
    /// Inline, on the thread that posted the event.
    #[default]
    Posting,
    /// On the main context; inline if the poster already is on it.
    Main,
    /// Always queued to the main context, even when posted from it.
    MainOrdered,
    /// On the single background worker; inline if the poster already is that worker.
    Background,
    /// On the async pool, one job per delivery, no ordering.
    Async,
}

impl ThreadMode {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ThreadMode::Posting => "posting",
            ThreadMode::Main => "main",
            ThreadMode::MainOrdered => "main_ordered",
            ThreadMode::Background => "background",
            ThreadMode::Async => "async",
        }
    }
}

/// The subscribe marker: attached to a member to declare it a subscriber method.
///
/// ```rust
/// use postbus::{Subscribe, ThreadMode};
///
/// let marker = Subscribe::new()
///     .with_thread_mode(ThreadMode::Background)
///     .with_priority(10)
///     .with_sticky(true);
/// assert_eq!(marker.priority, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Subscribe {
    /// Delivery context.
    pub thread_mode: ThreadMode,
    /// Higher values are delivered first within one event type.
    pub priority: i32,
    /// Replay the last sticky event of the type on registration.
    pub sticky: bool,
}

impl Subscribe {
    /// Posting mode, priority 0, not sticky.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_thread_mode(mut self, mode: ThreadMode) -> Self {
        self.thread_mode = mode;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_sticky(mut self, sticky: bool) -> Self {
        self.sticky = sticky;
        self
    }
}

/// A resolved subscriber method.
#[derive(Clone)]
pub struct SubscriberMethod {
    declaring: ClassId,
    name: Arc<str>,
    event_type: EventType,
    marker: Subscribe,
    invoker: Invoker,
}

impl SubscriberMethod {
    /// Creates a method whose invoker expects an instance of `declaring`.
    pub fn new(
        declaring: ClassId,
        name: impl Into<Arc<str>>,
        event_type: EventType,
        marker: Subscribe,
        invoker: Invoker,
    ) -> Self {
        Self {
            declaring,
            name: name.into(),
            event_type,
            marker,
            invoker,
        }
    }

    #[inline]
    pub fn declaring_class(&self) -> ClassId {
        self.declaring
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    #[inline]
    pub fn thread_mode(&self) -> ThreadMode {
        self.marker.thread_mode
    }

    #[inline]
    pub fn priority(&self) -> i32 {
        self.marker.priority
    }

    #[inline]
    pub fn sticky(&self) -> bool {
        self.marker.sticky
    }

    /// `Class::name` (for logs and errors).
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.declaring.name(), self.name)
    }

    /// Calls the method on `subscriber` (an instance of the class it was resolved for).
    pub fn invoke(&self, subscriber: &dyn Any, event: &dyn Event) -> anyhow::Result<()> {
        (self.invoker)(subscriber, event)
    }

    /// Returns the same method, callable on instances that `projection` maps
    /// onto the declaring class.
    pub(crate) fn bound_through(&self, projection: Option<&Projection>) -> Self {
        let Some(projection) = projection else {
            return self.clone();
        };
        let projection = Arc::clone(projection);
        let invoker = Arc::clone(&self.invoker);
        let declaring = self.declaring;
        let bound: Invoker = Arc::new(move |subscriber: &dyn Any, event: &dyn Event| {
            let Some(part) = projection(subscriber) else {
                anyhow::bail!("subscriber has no {} part", declaring.name());
            };
            invoker(part, event)
        });
        Self {
            invoker: bound,
            ..self.clone()
        }
    }
}

impl PartialEq for SubscriberMethod {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring
            && self.event_type == other.event_type
            && self.name == other.name
    }
}

impl Eq for SubscriberMethod {}

impl Hash for SubscriberMethod {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring.hash(state);
        self.name.hash(state);
        self.event_type.hash(state);
    }
}

impl fmt::Debug for SubscriberMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberMethod")
            .field("method", &self.qualified_name())
            .field("event_type", &self.event_type)
            .field("thread_mode", &self.marker.thread_mode)
            .field("priority", &self.marker.priority)
            .field("sticky", &self.marker.sticky)
            .finish()
    }
}
