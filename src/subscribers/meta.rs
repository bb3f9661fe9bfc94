//! # Subscriber class metadata
//!
//! The bus cannot reflect over Rust types, so every subscriber type describes
//! itself through [`Subscriber::class`], returning a [`ClassMeta`]: the members
//! it declares and, optionally, a superclass it embeds.
//!
//! ```text
//! ClassMeta(Screen)
//!   ├─ members: on_ping(Ping) [Subscribe], on_tick(Tick) [Subscribe{Main}], ...
//!   └─ superclass ─► ClassMeta(BaseScreen)       (reached through |s| &s.base)
//!                      └─ members: on_ping(Ping) [Subscribe]   ← overridden above
//! ```
//!
//! Members carry the same facts the resolver would read from reflection in a
//! managed runtime: name, parameter types, visibility, modifiers and the
//! optional subscribe marker. Members built from closures are public and have
//! one parameter; [`Member::declared`] describes anything else (abstract
//! declarations, wrong arity, non-public members), which lets strict method
//! verification be exercised.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use postbus::{event_type, ClassMeta, Subscribe, Subscriber, ThreadMode};
//!
//! struct Ping;
//! event_type!(Ping);
//!
//! struct Counter { hits: std::sync::atomic::AtomicU32 }
//!
//! impl Subscriber for Counter {
//!     fn class() -> ClassMeta {
//!         ClassMeta::builder::<Self>()
//!             .subscribe("on_ping", Subscribe::new(), |me: &Self, _: &Ping| {
//!                 me.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!                 Ok(())
//!             })
//!             .build()
//!     }
//! }
//!
//! let meta = Counter::class();
//! assert_eq!(meta.members().len(), 1);
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bitflags::bitflags;

use super::method::{Invoker, Projection, Subscribe, projection};
use crate::events::{Event, EventType, Hierarchy};

/// Identity of a subscriber class.
#[derive(Clone, Copy)]
pub struct ClassId {
    id: TypeId,
    name: &'static str,
}

impl ClassId {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the class lives in a platform namespace the resolver never scans.
    pub(crate) fn is_platform(&self) -> bool {
        const PLATFORM: [&str; 3] = ["std::", "core::", "alloc::"];
        PLATFORM.iter().any(|prefix| self.name.starts_with(prefix))
    }
}

impl PartialEq for ClassId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClassId {}

impl Hash for ClassId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

bitflags! {
    /// Member modifiers relevant to subscriber resolution.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const ABSTRACT = 0b0001;
        const STATIC = 0b0010;
        const SYNTHETIC = 0b0100;
        const BRIDGE = 0b1000;
    }
}

impl Modifiers {
    /// Members carrying any of these are never subscriber methods.
    pub const IGNORED: Modifiers = Modifiers::all();
}

/// One declared member of a subscriber class.
#[derive(Clone)]
pub struct Member {
    name: Arc<str>,
    params: Vec<EventType>,
    visibility: Visibility,
    modifiers: Modifiers,
    marker: Option<Subscribe>,
    invoker: Option<Invoker>,
}

impl Member {
    /// A public, one-parameter member whose body is `handler`.
    ///
    /// `handler` receives the event viewed as `E`: the concrete type or, for
    /// events of a subclass, the embedded `E` part.
    pub fn handler<S, E, F>(name: impl Into<Arc<str>>, handler: F) -> Self
    where
        S: Any + Send + Sync,
        E: Event + Hierarchy,
        F: Fn(&S, &E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let invoker: Invoker = Arc::new(move |subscriber: &dyn Any, event: &dyn Event| {
            let Some(subscriber) = subscriber.downcast_ref::<S>() else {
                anyhow::bail!("subscriber is not a {}", std::any::type_name::<S>());
            };
            let Some(event) = event.view::<E>() else {
                anyhow::bail!(
                    "event {} cannot be viewed as {}",
                    event.event_type(),
                    std::any::type_name::<E>()
                );
            };
            handler(subscriber, event)
        });
        Self {
            name: name.into(),
            params: vec![EventType::of::<E>()],
            visibility: Visibility::Public,
            modifiers: Modifiers::empty(),
            marker: None,
            invoker: Some(invoker),
        }
    }

    /// A public, one-parameter member declared against `E` (typically an
    /// interface) whose body receives the event untyped.
    pub fn dyn_handler<S, E, F>(name: impl Into<Arc<str>>, handler: F) -> Self
    where
        S: Any + Send + Sync,
        E: Hierarchy,
        F: Fn(&S, &dyn Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let invoker: Invoker = Arc::new(move |subscriber: &dyn Any, event: &dyn Event| {
            let Some(subscriber) = subscriber.downcast_ref::<S>() else {
                anyhow::bail!("subscriber is not a {}", std::any::type_name::<S>());
            };
            handler(subscriber, event)
        });
        Self {
            name: name.into(),
            params: vec![EventType::of::<E>()],
            visibility: Visibility::Public,
            modifiers: Modifiers::empty(),
            marker: None,
            invoker: Some(invoker),
        }
    }

    /// A member without a body; always carries [`Modifiers::ABSTRACT`].
    pub fn declared(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            visibility: Visibility::Public,
            modifiers: Modifiers::ABSTRACT,
            marker: None,
            invoker: None,
        }
    }

    /// Appends a parameter of type `E`.
    #[must_use]
    pub fn param<E: Hierarchy>(mut self) -> Self {
        self.params.push(EventType::of::<E>());
        self
    }

    /// Attaches the subscribe marker.
    #[must_use]
    pub fn marked(mut self, marker: Subscribe) -> Self {
        self.marker = Some(marker);
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Adds modifiers (never removes [`Modifiers::ABSTRACT`] from a declaration).
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn params(&self) -> &[EventType] {
        &self.params
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    #[inline]
    pub fn marker(&self) -> Option<Subscribe> {
        self.marker
    }

    #[inline]
    pub(crate) fn invoker(&self) -> Option<&Invoker> {
        self.invoker.as_ref()
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("visibility", &self.visibility)
            .field("modifiers", &self.modifiers)
            .field("marker", &self.marker)
            .finish()
    }
}

/// Link from a class to the superclass it embeds.
#[derive(Clone)]
pub struct SuperClass {
    meta: Arc<ClassMeta>,
    projection: Projection,
}

impl SuperClass {
    #[inline]
    pub fn meta(&self) -> &ClassMeta {
        &self.meta
    }

    #[inline]
    pub(crate) fn projection(&self) -> &Projection {
        &self.projection
    }
}

/// Introspectable description of a subscriber class.
#[derive(Clone)]
pub struct ClassMeta {
    id: ClassId,
    members: Vec<Member>,
    superclass: Option<SuperClass>,
}

impl ClassMeta {
    /// Starts describing class `S`.
    pub fn builder<S: Any + Send + Sync>() -> ClassBuilder<S> {
        ClassBuilder {
            meta: ClassMeta {
                id: ClassId::of::<S>(),
                members: Vec::new(),
                superclass: None,
            },
            _class: std::marker::PhantomData,
        }
    }

    #[inline]
    pub fn id(&self) -> ClassId {
        self.id
    }

    #[inline]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[inline]
    pub fn superclass(&self) -> Option<&SuperClass> {
        self.superclass.as_ref()
    }
}

impl fmt::Debug for ClassMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMeta")
            .field("id", &self.id)
            .field("members", &self.members)
            .field("superclass", &self.superclass.as_ref().map(|s| s.meta.id))
            .finish()
    }
}

/// Builder for [`ClassMeta`], typed on the class being described.
pub struct ClassBuilder<S> {
    meta: ClassMeta,
    _class: std::marker::PhantomData<fn(&S)>,
}

impl<S: Any + Send + Sync> ClassBuilder<S> {
    /// Declares a subscriber method handling `E`.
    #[must_use]
    pub fn subscribe<E, F>(self, name: &str, marker: Subscribe, handler: F) -> Self
    where
        E: Event + Hierarchy,
        F: Fn(&S, &E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.member(Member::handler::<S, E, F>(name, handler).marked(marker))
    }

    /// Declares a subscriber method on type `E` whose body gets the untyped event;
    /// use it for interfaces, which have no value to view.
    #[must_use]
    pub fn subscribe_dyn<E, F>(self, name: &str, marker: Subscribe, handler: F) -> Self
    where
        E: Hierarchy,
        F: Fn(&S, &dyn Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.member(Member::dyn_handler::<S, E, F>(name, handler).marked(marker))
    }

    /// Adds an arbitrary member.
    #[must_use]
    pub fn member(mut self, member: Member) -> Self {
        self.meta.members.push(member);
        self
    }

    /// Declares that `S` embeds superclass `B`, reached through `project`.
    #[must_use]
    pub fn extends<B: super::Subscriber>(mut self, project: fn(&S) -> &B) -> Self {
        let projection = projection(move |value: &dyn Any| {
            value
                .downcast_ref::<S>()
                .map(|child| project(child) as &dyn Any)
        });
        self.meta.superclass = Some(SuperClass {
            meta: Arc::new(B::class()),
            projection,
        });
        self
    }

    pub fn build(self) -> ClassMeta {
        self.meta
    }
}
