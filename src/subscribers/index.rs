//! # Precomputed subscriber index
//!
//! An index hands the resolver ready-made subscriber methods per class, so the
//! metadata of that class level is never scanned. It plays the role a build-time
//! generated index plays in runtimes with reflection.
//!
//! ```text
//! resolve(Screen)
//!   level Screen     ─► index hit?   yes ─► SubscriberInfo(Screen).methods
//!   level BaseScreen ─► Screen info's superclass_info describes BaseScreen? use it
//!                       else index hit? else scan ClassMeta(BaseScreen)
//! ```
//!
//! Invokers inside a [`SubscriberInfo`] expect an instance of the class the info
//! describes; the resolver binds them through the superclass projections when
//! the info is used for an ancestor level.

use std::collections::HashMap;
use std::sync::Arc;

use super::meta::{ClassId, Modifiers, Visibility};
use super::method::SubscriberMethod;
use super::subscriber::Subscriber;

/// Source of precomputed subscriber methods.
pub trait SubscriberInfoIndex: Send + Sync {
    /// Returns the info for `class`, if this index knows it.
    fn subscriber_info(&self, class: ClassId) -> Option<Arc<SubscriberInfo>>;
}

/// Precomputed subscriber methods of one class level.
#[derive(Debug, Clone)]
pub struct SubscriberInfo {
    class: ClassId,
    methods: Vec<SubscriberMethod>,
    superclass_info: Option<Arc<SubscriberInfo>>,
}

impl SubscriberInfo {
    pub fn new(class: ClassId, methods: Vec<SubscriberMethod>) -> Self {
        Self {
            class,
            methods,
            superclass_info: None,
        }
    }

    /// Links the info of the direct superclass level.
    #[must_use]
    pub fn with_superclass_info(mut self, info: Arc<SubscriberInfo>) -> Self {
        self.superclass_info = Some(info);
        self
    }

    /// Precomputes the level declared directly by `S`, applying the same
    /// qualification rules as the metadata scan (public, no ignored modifiers,
    /// one parameter, marked). Misdeclared members are left out.
    pub fn generate<S: Subscriber>() -> Self {
        let meta = S::class();
        let class = meta.id();
        let methods = meta
            .members()
            .iter()
            .filter(|m| m.visibility() == Visibility::Public)
            .filter(|m| !m.modifiers().intersects(Modifiers::IGNORED))
            .filter(|m| m.params().len() == 1)
            .filter_map(|m| {
                let marker = m.marker()?;
                let invoker = m.invoker()?;
                Some(SubscriberMethod::new(
                    class,
                    m.shared_name(),
                    m.params()[0],
                    marker,
                    Arc::clone(invoker),
                ))
            })
            .collect();
        Self::new(class, methods)
    }

    #[inline]
    pub fn class(&self) -> ClassId {
        self.class
    }

    #[inline]
    pub fn methods(&self) -> &[SubscriberMethod] {
        &self.methods
    }

    #[inline]
    pub fn superclass_info(&self) -> Option<&Arc<SubscriberInfo>> {
        self.superclass_info.as_ref()
    }
}

/// Map-backed [`SubscriberInfoIndex`].
///
/// ```rust
/// use postbus::{event_type, ClassMeta, SimpleIndex, Subscribe, Subscriber};
///
/// struct Ping;
/// event_type!(Ping);
/// struct Screen;
///
/// impl Subscriber for Screen {
///     fn class() -> ClassMeta {
///         ClassMeta::builder::<Self>()
///             .subscribe("on_ping", Subscribe::new(), |_: &Self, _: &Ping| Ok(()))
///             .build()
///     }
/// }
///
/// let index = SimpleIndex::builder().generate::<Screen>().build();
/// assert_eq!(index.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SimpleIndex {
    infos: HashMap<ClassId, Arc<SubscriberInfo>>,
}

impl SimpleIndex {
    pub fn builder() -> SimpleIndexBuilder {
        SimpleIndexBuilder::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

impl SubscriberInfoIndex for SimpleIndex {
    fn subscriber_info(&self, class: ClassId) -> Option<Arc<SubscriberInfo>> {
        self.infos.get(&class).cloned()
    }
}

/// Builder for [`SimpleIndex`].
#[derive(Default)]
pub struct SimpleIndexBuilder {
    infos: HashMap<ClassId, Arc<SubscriberInfo>>,
}

impl SimpleIndexBuilder {
    /// Adds a hand-written info.
    #[must_use]
    pub fn add(mut self, info: SubscriberInfo) -> Self {
        self.infos.insert(info.class(), Arc::new(info));
        self
    }

    /// Adds the generated info of `S`'s own level.
    #[must_use]
    pub fn generate<S: Subscriber>(self) -> Self {
        self.add(SubscriberInfo::generate::<S>())
    }

    pub fn build(self) -> SimpleIndex {
        SimpleIndex { infos: self.infos }
    }
}
