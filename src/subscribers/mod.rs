//! # Subscribers: class description and method resolution.
//!
//! This module provides the [`Subscriber`] trait, the metadata a subscriber type
//! uses to describe itself, and the resolver that turns that description into
//! subscriber methods.
//!
//! ## Architecture
//! ```text
//! Subscriber::class() ──► ClassMeta ──┐
//!                                     ├──► SubscriberMethodFinder ──► [SubscriberMethod]
//! SubscriberInfoIndex ──► SubscriberInfo ┘        (cached per class)        │
//!                                                                           ▼
//!                                   register(&Arc<S>) ──► Subscription (instance + method)
//! ```
//!
//! ## Contents
//! - [`ClassMeta`], [`ClassBuilder`], [`Member`], [`Modifiers`], [`Visibility`] class description
//! - [`Subscribe`], [`ThreadMode`], [`SubscriberMethod`] resolved interest declarations
//! - [`SubscriberInfoIndex`], [`SubscriberInfo`], [`SimpleIndex`] precomputed indexes
//! - [`LogWriter`] demo subscriber (feature `logging`)

mod finder;
mod index;
#[cfg(feature = "logging")]
mod log;
mod meta;
mod method;
mod subscriber;
mod subscription;

pub(crate) use finder::SubscriberMethodFinder;
pub use index::{SimpleIndex, SimpleIndexBuilder, SubscriberInfo, SubscriberInfoIndex};
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use meta::{ClassBuilder, ClassId, ClassMeta, Member, Modifiers, SuperClass, Visibility};
pub use method::{Invoker, Projection, Subscribe, SubscriberMethod, ThreadMode, projection};
pub use subscriber::Subscriber;
pub(crate) use subscription::{SubscriberId, Subscription};
