//! Subscriber types for the reactive system.
//!
//! A Subscriber represents any computation that depends on reactive values:
//! watchers, computed values and render functions. The engine only needs
//! three things from one: an id for ordering, a way to record a dependency,
//! and a way to be told that a dependency changed.

use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::Dep;
use super::runtime::Runtime;

/// Unique identifier for a subscriber.
///
/// Ids increase monotonically, so a subscriber created earlier (a parent)
/// always has a smaller id than one created later (its children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Any computation that tracks reactive reads.
pub trait Subscriber {
    /// Record `dep` as a dependency of the current evaluation pass.
    ///
    /// Implementations decide whether to register with the dep; the usual
    /// response is `dep.add_sub(..)` the first time a dep is seen.
    fn add_dep(&self, dep: &Dep);

    /// Called by a dep when one of this subscriber's dependencies changed.
    fn update(&self, rt: &mut Runtime);
}

/// A type-erased, weakly held subscriber.
///
/// Deps hold subscribers weakly: a dropped subscriber simply stops
/// receiving notifications.
#[derive(Clone)]
pub struct AnySubscriber(SubscriberId, Weak<dyn Subscriber>);

impl AnySubscriber {
    pub fn new(id: SubscriberId, subscriber: Weak<dyn Subscriber>) -> Self {
        Self(id, subscriber)
    }

    pub fn id(&self) -> SubscriberId {
        self.0
    }

    /// Whether the underlying subscriber is still alive.
    pub fn is_alive(&self) -> bool {
        self.1.strong_count() > 0
    }

    pub fn add_dep(&self, dep: &Dep) {
        if let Some(inner) = self.1.upgrade() {
            inner.add_dep(dep);
        }
    }

    pub fn update(&self, rt: &mut Runtime) {
        if let Some(inner) = self.1.upgrade() {
            inner.update(rt);
        }
    }
}

impl Debug for AnySubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AnySubscriber").field(&self.0).finish()
    }
}

impl Hash for AnySubscriber {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialEq for AnySubscriber {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for AnySubscriber {}
