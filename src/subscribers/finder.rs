//! # Subscriber method resolution
//!
//! [`SubscriberMethodFinder`] turns a subscriber class into the list of its
//! subscriber methods, walking from the concrete class up through the
//! superclasses it embeds.
//!
//! ```text
//! find::<Screen>()
//!   cache hit? ─► return
//!   depth 0: Screen      ─► index info | scan members
//!   depth 1: BaseScreen  ─► index info | scan members   (bound through |s| &s.base)
//!   depth 2: platform?   ─► stop
//!   empty? ─► NoSubscriberMethods      else cache + return
//! ```
//!
//! ## Rules
//! - A member qualifies when it is public, carries no ignored modifiers, has
//!   exactly one parameter and the subscribe marker.
//! - With strict verification a marked member that does not qualify is an error;
//!   otherwise it is skipped silently.
//! - Key `(name, event type)`: the declaration closest to the concrete class
//!   wins, so a subclass overrides its superclass. Two declarations with the same
//!   key on one level are an error.
//! - Methods for the same event type under different names all survive.
//! - Only successful resolutions are cached.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::index::{SubscriberInfo, SubscriberInfoIndex};
use super::meta::{ClassId, ClassMeta, Modifiers, Visibility};
use super::method::{Projection, SubscriberMethod, compose};
use super::subscriber::Subscriber;
use crate::error::EventBusError;
use crate::events::EventType;

const POOL_SIZE: usize = 4;

/// Scratch state of one resolution; pooled between resolutions.
#[derive(Default)]
struct FindState {
    methods: Vec<SubscriberMethod>,
    depth_by_key: HashMap<(String, EventType), usize>,
}

impl FindState {
    fn check_add(&mut self, method: SubscriberMethod, depth: usize) -> Result<(), EventBusError> {
        let key = (method.name().to_owned(), method.event_type());
        match self.depth_by_key.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(depth);
                self.methods.push(method);
                Ok(())
            }
            Entry::Occupied(slot) if *slot.get() == depth => {
                Err(EventBusError::DuplicateSubscriberMethod {
                    class: method.declaring_class().name(),
                    method: format!("{}({})", method.name(), method.event_type()),
                })
            }
            // overridden by a subclass
            Entry::Occupied(_) => Ok(()),
        }
    }

    fn recycle(&mut self) {
        self.methods.clear();
        self.depth_by_key.clear();
    }
}

/// Resolves and caches subscriber methods per class.
pub struct SubscriberMethodFinder {
    cache: RwLock<HashMap<ClassId, Arc<[SubscriberMethod]>>>,
    indexes: Vec<Arc<dyn SubscriberInfoIndex>>,
    strict: bool,
    ignore_index: bool,
    pool: Mutex<Vec<FindState>>,
}

impl SubscriberMethodFinder {
    pub fn new(
        indexes: Vec<Arc<dyn SubscriberInfoIndex>>,
        strict: bool,
        ignore_index: bool,
    ) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            indexes,
            strict,
            ignore_index,
            pool: Mutex::new(Vec::with_capacity(POOL_SIZE)),
        }
    }

    /// Returns the subscriber methods of `S`, resolving them on the first call.
    ///
    /// # Errors
    /// [`EventBusError::NoSubscriberMethods`], [`EventBusError::InvalidSubscriberMethod`]
    /// (strict mode) or [`EventBusError::DuplicateSubscriberMethod`].
    pub fn find<S: Subscriber>(&self) -> Result<Arc<[SubscriberMethod]>, EventBusError> {
        let class = ClassId::of::<S>();
        if let Some(hit) = self.cache.read().get(&class) {
            return Ok(Arc::clone(hit));
        }

        let meta = S::class();
        let methods = self.resolve(&meta)?;
        if methods.is_empty() {
            return Err(EventBusError::NoSubscriberMethods {
                class: class.name(),
            });
        }

        let methods: Arc<[SubscriberMethod]> = methods.into();
        // a concurrent resolution of the same class may have won; either result is equivalent
        self.cache.write().insert(class, Arc::clone(&methods));
        tracing::debug!(class = class.name(), methods = methods.len(), "subscriber resolved");
        Ok(methods)
    }

    /// Drops every cached resolution.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    fn resolve(&self, meta: &ClassMeta) -> Result<Vec<SubscriberMethod>, EventBusError> {
        let mut state = self.pool.lock().pop().unwrap_or_default();
        let walked = self.walk(meta, &mut state);
        let methods = std::mem::take(&mut state.methods);
        state.recycle();
        {
            let mut pool = self.pool.lock();
            if pool.len() < POOL_SIZE {
                pool.push(state);
            }
        }
        walked.map(|()| methods)
    }

    fn walk(&self, meta: &ClassMeta, state: &mut FindState) -> Result<(), EventBusError> {
        let mut level = Some((meta, None::<Projection>));
        let mut info: Option<Arc<SubscriberInfo>> = None;
        let mut depth = 0;

        while let Some((class, project)) = level {
            if class.id().is_platform() {
                break;
            }

            info = self.info_for(info.as_ref(), class.id());
            match &info {
                Some(info) => {
                    for method in info.methods() {
                        state.check_add(method.bound_through(project.as_ref()), depth)?;
                    }
                }
                None => self.scan(class, project.as_ref(), depth, state)?,
            }

            level = class.superclass().map(|sup| {
                let next = compose(project.as_ref(), sup.projection());
                (sup.meta(), Some(next))
            });
            depth += 1;
        }
        Ok(())
    }

    /// Index lookup for one level: the previous level's linked superclass info
    /// when it describes `class`, otherwise the first index that knows `class`.
    fn info_for(
        &self,
        previous: Option<&Arc<SubscriberInfo>>,
        class: ClassId,
    ) -> Option<Arc<SubscriberInfo>> {
        if self.ignore_index {
            return None;
        }
        if let Some(linked) = previous.and_then(|p| p.superclass_info()) {
            if linked.class() == class {
                return Some(Arc::clone(linked));
            }
        }
        self.indexes
            .iter()
            .find_map(|index| index.subscriber_info(class))
    }

    fn scan(
        &self,
        class: &ClassMeta,
        project: Option<&Projection>,
        depth: usize,
        state: &mut FindState,
    ) -> Result<(), EventBusError> {
        for member in class.members() {
            let callable = member.visibility() == Visibility::Public
                && !member.modifiers().intersects(Modifiers::IGNORED);
            let Some(marker) = member.marker() else {
                continue;
            };

            if !callable {
                if self.strict {
                    return Err(invalid(
                        class,
                        member.name(),
                        "must be public, non-static and non-abstract".into(),
                    ));
                }
                continue;
            }
            if member.params().len() != 1 {
                if self.strict {
                    return Err(invalid(
                        class,
                        member.name(),
                        format!(
                            "must have exactly 1 parameter but has {}",
                            member.params().len()
                        ),
                    ));
                }
                continue;
            }
            let Some(invoker) = member.invoker() else {
                continue;
            };

            let method = SubscriberMethod::new(
                class.id(),
                member.shared_name(),
                member.params()[0],
                marker,
                Arc::clone(invoker),
            );
            state.check_add(method.bound_through(project), depth)?;
        }
        Ok(())
    }
}

fn invalid(class: &ClassMeta, member: &str, reason: String) -> EventBusError {
    EventBusError::InvalidSubscriberMethod {
        method: format!("{}::{}", class.id().name(), member),
        reason,
    }
}

impl std::fmt::Debug for SubscriberMethodFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberMethodFinder")
            .field("cached", &self.cache.read().len())
            .field("indexes", &self.indexes.len())
            .field("strict", &self.strict)
            .field("ignore_index", &self.ignore_index)
            .finish()
    }
}
