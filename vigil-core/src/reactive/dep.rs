//! Dependency Node
//!
//! A `Dep` is the observable sentinel attached to one reactive location:
//! a property slot or a whole container. It keeps the ordered set of
//! subscribers that read the location and notifies them on change.
//!
//! # How Deps Work
//!
//! 1. A read inside an evaluation calls [`Dep::depend`], which hands the dep
//!    to the active subscriber. The subscriber decides whether to register
//!    itself through [`Dep::add_sub`].
//!
//! 2. A write calls [`Dep::notify`], which snapshots the subscriber set and
//!    calls `update` on each entry.
//!
//! Registration is idempotent per (dep, subscriber) pair, so a subscriber
//! is never notified twice by one notification pass.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::runtime::Runtime;
use super::subscriber::{AnySubscriber, SubscriberId};

/// Counter for generating unique dep IDs.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique, monotonically increasing identifier of a dep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

struct DepInner {
    id: DepId,
    subs: RefCell<IndexSet<AnySubscriber>>,
}

/// An observable that subscribers attach to.
///
/// Cloning shares the same subscriber set.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

impl Dep {
    /// A dep with a fresh id and no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: DepId::next(),
                subs: RefCell::new(IndexSet::new()),
            }),
        }
    }

    /// This dep's id.
    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Register a subscriber. Registering twice has no effect.
    pub fn add_sub(&self, sub: AnySubscriber) {
        self.inner.subs.borrow_mut().insert(sub);
    }

    /// Remove a subscriber, keeping the order of the others.
    pub fn remove_sub(&self, sub: &AnySubscriber) {
        self.inner.subs.borrow_mut().shift_remove(sub);
    }

    /// Hand this dep to the active subscriber, if there is one.
    pub fn depend(&self, rt: &Runtime) {
        if let Some(target) = rt.active_target() {
            target.add_dep(self);
        }
    }

    /// Notify every registered subscriber.
    ///
    /// Subscribers that have been dropped are unregistered first.
    /// Subscribers may unregister themselves while being notified; the pass
    /// works on a snapshot taken before the first `update`.
    pub fn notify(&self, rt: &mut Runtime) {
        let mut subs: SmallVec<[AnySubscriber; 4]> = {
            let mut set = self.inner.subs.borrow_mut();
            set.retain(AnySubscriber::is_alive);
            set.iter().cloned().collect()
        };

        if !rt.config().async_updates {
            // no scheduler will order these for us
            subs.sort_by_key(AnySubscriber::id);
        }

        tracing::trace!(dep = self.id().raw(), subscribers = subs.len(), "notify");

        for sub in subs {
            sub.update(rt);
        }
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subs.borrow().len()
    }

    /// Whether a subscriber with `id` is registered.
    pub fn has_subscriber(&self, id: SubscriberId) -> bool {
        self.inner.subs.borrow().iter().any(|sub| sub.id() == id)
    }

    /// Subscriber ids in registration order.
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.inner.subs.borrow().iter().map(AnySubscriber::id).collect()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Dep {}

impl Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::testing::Recorder;
    use std::cell::RefCell;

    #[test]
    fn dep_ids_increase() {
        let a = Dep::new();
        let b = Dep::new();
        assert!(a.id() < b.id());
    }

    #[test]
    fn registration_is_idempotent() {
        let recorder = Recorder::new();
        let dep = Dep::new();

        dep.add_sub(recorder.handle());
        dep.add_sub(recorder.handle());
        assert_eq!(dep.subscriber_count(), 1);

        let mut rt = Runtime::new();
        dep.notify(&mut rt);
        assert_eq!(recorder.updates(), 1);
    }

    #[test]
    fn remove_keeps_order() {
        let a = Recorder::new();
        let b = Recorder::new();
        let c = Recorder::new();
        let dep = Dep::new();

        dep.add_sub(a.handle());
        dep.add_sub(b.handle());
        dep.add_sub(c.handle());
        dep.remove_sub(&b.handle());

        assert_eq!(dep.subscriber_ids(), vec![a.id(), c.id()]);
    }

    #[test]
    fn depend_without_target_registers_nothing() {
        let rt = Runtime::new();
        let dep = Dep::new();
        dep.depend(&rt);
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn depend_registers_active_target() {
        let recorder = Recorder::new();
        let dep = Dep::new();
        let mut rt = Runtime::new();

        rt.with_target(Some(recorder.handle()), |rt| dep.depend(rt));
        assert!(dep.has_subscriber(recorder.id()));
    }

    #[test]
    fn synchronous_notify_orders_by_id() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let parent = Recorder::logging(&log);
        let child = Recorder::logging(&log);
        let dep = Dep::new();

        // registered child-first
        dep.add_sub(child.handle());
        dep.add_sub(parent.handle());

        let mut rt = Runtime::with_config(RuntimeConfig::synchronous());
        dep.notify(&mut rt);
        assert_eq!(*log.borrow(), vec![parent.id(), child.id()]);
    }

    #[test]
    fn async_notify_keeps_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let parent = Recorder::logging(&log);
        let child = Recorder::logging(&log);
        let dep = Dep::new();

        dep.add_sub(child.handle());
        dep.add_sub(parent.handle());

        let mut rt = Runtime::new();
        dep.notify(&mut rt);
        assert_eq!(*log.borrow(), vec![child.id(), parent.id()]);
    }

    #[test]
    fn dropped_subscriber_is_not_notified() {
        let kept = Recorder::new();
        let dropped = Recorder::new();
        let dep = Dep::new();
        dep.add_sub(kept.handle());
        dep.add_sub(dropped.handle());
        drop(dropped);

        let mut rt = Runtime::new();
        dep.notify(&mut rt);
        assert_eq!(kept.updates(), 1);
    }

    #[test]
    fn notify_unregisters_dropped_subscribers() {
        let kept = Recorder::new();
        let dep = Dep::new();
        dep.add_sub(kept.handle());
        for _ in 0..1000 {
            let gone = Recorder::new();
            dep.add_sub(gone.handle());
        }
        assert_eq!(dep.subscriber_count(), 1001);

        let mut rt = Runtime::new();
        dep.notify(&mut rt);
        assert_eq!(dep.subscriber_ids(), vec![kept.id()]);
        assert_eq!(kept.updates(), 1);
    }
}
