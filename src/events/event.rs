//! # Event types and their runtime hierarchy.
//!
//! Rust has no class inheritance, so the bus models it explicitly:
//!
//! - [`Hierarchy`] declares, for a type, its direct **superclass** (a
//!   [`Supertype`]: the parent type plus an upcast from the child value to the
//!   parent value it embeds) and the **interfaces** it implements (marker types
//!   that also implement [`Hierarchy`]).
//! - [`EventType`] is the runtime handle of such a type (identity = `TypeId`).
//! - [`Event`] is blanket-implemented for every `Hierarchy + Send + Sync` type
//!   and is what the bus carries around as `Arc<dyn Event>`.
//!
//! The [`event_type!`](crate::event_type) macro writes the [`Hierarchy`] impl.
//!
//! ## Example
//! ```rust
//! use postbus::{event_type, Event, EventType};
//!
//! struct Notice;
//! struct Base { id: u32 }
//! struct Ping { base: Base, payload: &'static str }
//!
//! event_type!(Notice);
//! event_type!(Base);
//! event_type!(Ping: Base = base; impl Notice);
//!
//! let ping = Ping { base: Base { id: 7 }, payload: "hi" };
//! let ev: &dyn Event = &ping;
//!
//! assert_eq!(ev.event_type(), EventType::of::<Ping>());
//! assert_eq!(ev.view::<Base>().map(|b| b.id), Some(7));
//! assert!(EventType::of::<Notice>().is_assignable_from(EventType::of::<Ping>()));
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Upcast from a child value to the parent value it embeds.
pub type Upcast = for<'a> fn(&'a dyn Any) -> Option<&'a dyn Any>;

/// Link from a type to its direct superclass.
#[derive(Clone, Copy)]
pub struct Supertype {
    ty: EventType,
    upcast: Upcast,
}

impl Supertype {
    /// Creates a link to `ty`, reached from a child value through `upcast`.
    pub fn new(ty: EventType, upcast: Upcast) -> Self {
        Self { ty, upcast }
    }

    /// The parent type.
    #[inline]
    pub fn event_type(&self) -> EventType {
        self.ty
    }

    /// Projects a child value onto its parent part.
    #[inline]
    pub fn upcast<'a>(&self, child: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.upcast)(child)
    }
}

/// Declares where a type sits in the event hierarchy.
///
/// Both methods default to "no parents", which is what plain event structs want.
pub trait Hierarchy: Any + Sized {
    /// Direct superclass, if any.
    fn superclass() -> Option<Supertype> {
        None
    }

    /// Directly implemented interfaces.
    fn interfaces() -> Vec<EventType> {
        Vec::new()
    }
}

/// Runtime handle of a [`Hierarchy`] type.
///
/// Equality and hashing use the `TypeId` only.
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    superclass: fn() -> Option<Supertype>,
    interfaces: fn() -> Vec<EventType>,
}

impl EventType {
    /// Returns the handle for `T`.
    pub fn of<T: Hierarchy>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            superclass: T::superclass,
            interfaces: T::interfaces,
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name (for logs).
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Direct superclass link.
    #[inline]
    pub fn superclass(&self) -> Option<Supertype> {
        (self.superclass)()
    }

    /// Directly implemented interfaces.
    #[inline]
    pub fn interfaces(&self) -> Vec<EventType> {
        (self.interfaces)()
    }

    /// Returns `true` if a value of `other` is also a `self`: same type, a
    /// superclass of it, or an interface it implements (transitively).
    ///
    /// Uncached; the bus uses [`TypeHierarchy`](crate::events::TypeHierarchy) on hot paths.
    pub fn is_assignable_from(&self, other: EventType) -> bool {
        let mut pending = vec![other];
        let mut seen: Vec<EventType> = Vec::new();
        while let Some(ty) = pending.pop() {
            if ty == *self {
                return true;
            }
            if seen.contains(&ty) {
                continue;
            }
            seen.push(ty);
            if let Some(sup) = ty.superclass() {
                pending.push(sup.event_type());
            }
            pending.extend(ty.interfaces());
        }
        false
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Supertype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Supertype").field(&self.ty).finish()
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An event object that can be posted on the bus.
///
/// Implemented automatically for every [`Hierarchy`] type that is `Send + Sync`.
pub trait Event: Any + Send + Sync + 'static {
    /// Concrete runtime type of this event.
    fn event_type(&self) -> EventType;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Hierarchy + Send + Sync> Event for T {
    fn event_type(&self) -> EventType {
        EventType::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl dyn Event {
    /// Returns `true` if the concrete type is `T`.
    #[inline]
    pub fn is<T: Event>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Downcasts to the concrete type `T`.
    #[inline]
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Views the event as `T`, which may be the concrete type or any superclass.
    ///
    /// Walks the superclass chain, upcasting at each step, until a `T` is found.
    pub fn view<T: Event>(&self) -> Option<&T> {
        let mut value = self.as_any();
        let mut ty = self.event_type();
        loop {
            if let Some(found) = value.downcast_ref::<T>() {
                return Some(found);
            }
            let sup = ty.superclass()?;
            value = sup.upcast(value)?;
            ty = sup.event_type();
        }
    }

    /// Address of the event allocation; identity for cancellation and sticky removal.
    #[inline]
    pub(crate) fn addr(&self) -> *const () {
        self as *const dyn Event as *const ()
    }

    /// Whether `addr` is this event or one of the superclass views [`view`](Self::view)
    /// hands out for it.
    pub(crate) fn is_viewed_at(&self, addr: *const ()) -> bool {
        let mut value = self.as_any();
        let mut ty = self.event_type();
        loop {
            if std::ptr::eq(value as *const dyn Any as *const (), addr) {
                return true;
            }
            let Some(sup) = ty.superclass() else {
                return false;
            };
            let Some(next) = sup.upcast(value) else {
                return false;
            };
            value = next;
            ty = sup.event_type();
        }
    }
}

impl fmt::Debug for dyn Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({})", self.event_type())
    }
}

/// Implements [`Hierarchy`] for an event type.
///
/// ```rust
/// use postbus::event_type;
///
/// struct Audit;
/// struct Notice;
/// struct Base { id: u32 }
/// struct Ping { base: Base }
/// struct Pong;
///
/// event_type!(Audit);
/// event_type!(Notice; impl Audit);        // interface extending an interface
/// event_type!(Base);
/// event_type!(Ping: Base = base; impl Notice);
/// event_type!(Pong; impl Notice, Audit);
/// ```
#[macro_export]
macro_rules! event_type {
    (@super $ty:ty, $sup:ty, $field:ident) => {{
        fn upcast(value: &dyn ::std::any::Any) -> ::std::option::Option<&dyn ::std::any::Any> {
            value
                .downcast_ref::<$ty>()
                .map(|child| &child.$field as &dyn ::std::any::Any)
        }
        ::std::option::Option::Some($crate::Supertype::new(
            $crate::EventType::of::<$sup>(),
            upcast,
        ))
    }};
    ($ty:ty) => {
        impl $crate::Hierarchy for $ty {}
    };
    ($ty:ty; impl $($iface:ty),+ $(,)?) => {
        impl $crate::Hierarchy for $ty {
            fn interfaces() -> ::std::vec::Vec<$crate::EventType> {
                ::std::vec![$($crate::EventType::of::<$iface>()),+]
            }
        }
    };
    ($ty:ty : $sup:ty = $field:ident) => {
        impl $crate::Hierarchy for $ty {
            fn superclass() -> ::std::option::Option<$crate::Supertype> {
                $crate::event_type!(@super $ty, $sup, $field)
            }
        }
    };
    ($ty:ty : $sup:ty = $field:ident; impl $($iface:ty),+ $(,)?) => {
        impl $crate::Hierarchy for $ty {
            fn superclass() -> ::std::option::Option<$crate::Supertype> {
                $crate::event_type!(@super $ty, $sup, $field)
            }

            fn interfaces() -> ::std::vec::Vec<$crate::EventType> {
                ::std::vec![$($crate::EventType::of::<$iface>()),+]
            }
        }
    };
}
