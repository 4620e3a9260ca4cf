//! Watcher
//!
//! A Watcher is the reference subscriber: it evaluates a getter against the
//! runtime, records every dep read during the evaluation, and re-runs when
//! any of them notifies.
//!
//! # How Watchers Work
//!
//! 1. `get` pushes the watcher as the active target and runs the getter.
//!    Each intercepted read hands its dep to [`Watcher::add_dep`], which
//!    collects it into the set for the current pass.
//!
//! 2. After the getter returns, deps read in the previous pass but not in
//!    this one are unregistered. A watcher therefore only reacts to what it
//!    read most recently.
//!
//! 3. On notification, a lazy watcher only marks itself dirty; a sync
//!    watcher re-runs at once; any other watcher is handed to the attached
//!    [`Scheduler`], or re-runs at once if there is none.
//!
//! # Lazy Watchers
//!
//! Lazy watchers back computed values. They do not evaluate until
//! [`Watcher::evaluate`] is called, and [`Watcher::depend`] forwards their
//! deps to whatever target is reading them.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use super::dep::{Dep, DepId};
use super::runtime::Runtime;
use super::subscriber::{AnySubscriber, Subscriber, SubscriberId};
use crate::value::Value;

/// Expression evaluated by a watcher.
pub type WatchGetter = Rc<dyn Fn(&mut Runtime) -> Value>;

/// Called after a run with `(new, old)`.
pub type WatchCallback = Rc<dyn Fn(&mut Runtime, &Value, &Value)>;

/// Deferred execution policy for non-sync watchers.
pub trait Scheduler {
    fn queue(&self, watcher: Rc<Watcher>);
}

#[derive(Clone, Default)]
pub struct WatcherOptions {
    /// Defer evaluation until [`Watcher::evaluate`].
    pub lazy: bool,
    /// Re-run immediately on notification, bypassing the scheduler.
    pub sync: bool,
    pub callback: Option<WatchCallback>,
    pub scheduler: Option<Rc<dyn Scheduler>>,
}

impl WatcherOptions {
    /// Options for a watcher that waits for [`Watcher::evaluate`].
    pub fn lazy() -> Self {
        Self {
            lazy: true,
            ..Self::default()
        }
    }

    /// Options for a watcher that re-runs as soon as it is notified.
    pub fn sync() -> Self {
        Self {
            sync: true,
            ..Self::default()
        }
    }

    /// Call `callback` with `(new, old)` after each run that changes the value.
    pub fn with_callback(mut self, callback: impl Fn(&mut Runtime, &Value, &Value) + 'static) -> Self {
        self.callback = Some(Rc::new(callback));
        self
    }

    /// Queue runs on `scheduler` instead of running them inline.
    pub fn with_scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }
}

/// Deps of the previous pass and the pass in progress.
#[derive(Default)]
struct DepSets {
    deps: Vec<Dep>,
    dep_ids: HashSet<DepId>,
    new_deps: Vec<Dep>,
    new_dep_ids: HashSet<DepId>,
}

/// A subscriber that evaluates a getter and re-runs it on change.
pub struct Watcher {
    id: SubscriberId,
    me: Weak<Watcher>,
    getter: WatchGetter,
    options: WatcherOptions,
    value: RefCell<Value>,
    sets: RefCell<DepSets>,
    dirty: Cell<bool>,
    active: Cell<bool>,
    runs: Cell<usize>,
}

impl Watcher {
    /// Create a watcher. Non-lazy watchers evaluate once immediately.
    pub fn new(
        rt: &mut Runtime,
        getter: impl Fn(&mut Runtime) -> Value + 'static,
        options: WatcherOptions,
    ) -> Rc<Self> {
        let lazy = options.lazy;
        let watcher = Rc::new_cyclic(|me| Self {
            id: SubscriberId::new(),
            me: me.clone(),
            getter: Rc::new(getter),
            options,
            value: RefCell::new(Value::undefined()),
            sets: RefCell::new(DepSets::default()),
            dirty: Cell::new(lazy),
            active: Cell::new(true),
            runs: Cell::new(0),
        });

        if !lazy {
            let value = watcher.get(rt);
            *watcher.value.borrow_mut() = value;
        }

        watcher
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Type-erased handle for dep registration and the target stack.
    pub fn handle(&self) -> AnySubscriber {
        AnySubscriber::new(self.id, self.me.clone() as Weak<dyn Subscriber>)
    }

    /// The value from the latest evaluation.
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Number of getter evaluations so far.
    pub fn run_count(&self) -> usize {
        self.runs.get()
    }

    /// Deps registered by the latest completed pass.
    pub fn deps(&self) -> Vec<Dep> {
        self.sets.borrow().deps.clone()
    }

    /// Evaluate the getter with this watcher as the active target, then
    /// drop deps that were not read.
    pub fn get(&self, rt: &mut Runtime) -> Value {
        let getter = Rc::clone(&self.getter);
        let value = rt.with_target(Some(self.handle()), |rt| getter(rt));
        self.runs.set(self.runs.get() + 1);
        self.cleanup_deps();
        value
    }

    /// Unregister from deps not read in the latest pass and promote the
    /// new dep set.
    pub fn cleanup_deps(&self) {
        let handle = self.handle();
        let mut sets = self.sets.borrow_mut();
        let sets = &mut *sets;

        for dep in &sets.deps {
            if !sets.new_dep_ids.contains(&dep.id()) {
                dep.remove_sub(&handle);
            }
        }

        std::mem::swap(&mut sets.deps, &mut sets.new_deps);
        std::mem::swap(&mut sets.dep_ids, &mut sets.new_dep_ids);
        sets.new_deps.clear();
        sets.new_dep_ids.clear();
    }

    /// Re-evaluate and invoke the callback if the value changed.
    ///
    /// Containers always count as changed, since their contents may have
    /// been mutated in place.
    pub fn run(&self, rt: &mut Runtime) {
        if !self.active.get() {
            return;
        }

        let value = self.get(rt);
        let old = self.value.replace(value.clone());

        let changed = !value.strict_eq(&old) || value.handle().is_some();
        if !changed {
            return;
        }

        if let Some(callback) = self.options.callback.clone() {
            callback(rt, &value, &old);
        }
    }

    /// Evaluate a lazy watcher and clear its dirty flag.
    pub fn evaluate(&self, rt: &mut Runtime) -> Value {
        let value = self.get(rt);
        *self.value.borrow_mut() = value.clone();
        self.dirty.set(false);
        value
    }

    /// Register every dep of this watcher with the active target.
    pub fn depend(&self, rt: &Runtime) {
        for dep in self.deps() {
            dep.depend(rt);
        }
    }

    /// Unsubscribe from every dep. A torn-down watcher never runs again.
    pub fn teardown(&self) {
        if !self.active.replace(false) {
            return;
        }
        let handle = self.handle();
        let mut sets = self.sets.borrow_mut();
        for dep in sets.deps.drain(..) {
            dep.remove_sub(&handle);
        }
        sets.dep_ids.clear();
        tracing::trace!(watcher = self.id.raw(), "teardown");
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Subscriber for Watcher {
    fn add_dep(&self, dep: &Dep) {
        let mut sets = self.sets.borrow_mut();
        let id = dep.id();
        if !sets.new_dep_ids.insert(id) {
            return;
        }
        sets.new_deps.push(dep.clone());
        if !sets.dep_ids.contains(&id) {
            dep.add_sub(self.handle());
        }
    }

    fn update(&self, rt: &mut Runtime) {
        if self.options.lazy {
            self.dirty.set(true);
            return;
        }
        if self.options.sync {
            self.run(rt);
            return;
        }
        match (&self.options.scheduler, self.me.upgrade()) {
            (Some(scheduler), Some(me)) => scheduler.queue(me),
            _ => self.run(rt),
        }
    }
}

impl Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("lazy", &self.options.lazy)
            .field("sync", &self.options.sync)
            .field("dirty", &self.dirty.get())
            .field("active", &self.active.get())
            .field("dep_count", &self.sets.borrow().deps.len())
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

    fn counter_object(rt: &mut Runtime, start: i32) -> crate::value::ObjectRef {
        let obj = rt.new_object();
        rt.put(obj, "count", Value::from(start)).unwrap();
        rt.observe(&Value::Object(obj), false);
        obj
    }

    #[test]
    fn watcher_evaluates_on_creation() {
        let mut rt = Runtime::new();
        let obj = counter_object(&mut rt, 3);

        let w = Watcher::new(&mut rt, move |rt| rt.get(obj, "count").unwrap(), WatcherOptions::sync());

        assert_eq!(w.value(), Value::from(3));
        assert_eq!(w.run_count(), 1);
        assert_eq!(w.deps().len(), 1);
    }

    #[test]
    fn lazy_watcher_waits_for_evaluate() {
        let mut rt = Runtime::new();
        let obj = counter_object(&mut rt, 3);

        let w = Watcher::new(&mut rt, move |rt| rt.get(obj, "count").unwrap(), WatcherOptions::lazy());
        assert_eq!(w.run_count(), 0);
        assert!(w.is_dirty());

        assert_eq!(w.evaluate(&mut rt), Value::from(3));
        assert!(!w.is_dirty());

        rt.put(obj, "count", Value::from(4)).unwrap();
        assert!(w.is_dirty());
        assert_eq!(w.run_count(), 1);
    }

    #[test]
    fn callback_receives_new_and_old() {
        let mut rt = Runtime::new();
        let obj = counter_object(&mut rt, 1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let options = WatcherOptions::sync().with_callback(move |_rt, new, old| {
            sink.borrow_mut().push((new.clone(), old.clone()));
        });
        let _w = Watcher::new(&mut rt, move |rt| rt.get(obj, "count").unwrap(), options);

        rt.put(obj, "count", Value::from(2)).unwrap();
        assert_eq!(*seen.borrow(), vec![(Value::from(2), Value::from(1))]);
    }

    #[test]
    fn unchanged_result_skips_callback() {
        let mut rt = Runtime::new();
        let obj = counter_object(&mut rt, 1);
        let calls = Rc::new(Cell::new(0));
        let counted = Rc::clone(&calls);

        let options = WatcherOptions::sync().with_callback(move |_, _, _| counted.set(counted.get() + 1));
        let w = Watcher::new(
            &mut rt,
            move |rt| {
                let n = rt.get(obj, "count").unwrap().as_number().unwrap_or(0.0);
                Value::from(n > 0.0)
            },
            options,
        );

        rt.put(obj, "count", Value::from(2)).unwrap();
        assert_eq!(w.run_count(), 2);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn reading_twice_registers_once() {
        let mut rt = Runtime::new();
        let obj = counter_object(&mut rt, 1);

        let w = Watcher::new(
            &mut rt,
            move |rt| {
                rt.get(obj, "count").unwrap();
                rt.get(obj, "count").unwrap()
            },
            WatcherOptions::sync(),
        );

        let dep = rt.property_dep(obj, "count").unwrap();
        assert_eq!(dep.subscriber_count(), 1);
        assert_eq!(w.deps().len(), 1);

        rt.put(obj, "count", Value::from(2)).unwrap();
        assert_eq!(w.run_count(), 2);
    }

    #[test]
    fn unread_deps_are_dropped() {
        let mut rt = Runtime::new();
        let obj = rt.new_object();
        rt.put(obj, "flag", Value::from(true)).unwrap();
        rt.put(obj, "a", Value::from(1)).unwrap();
        rt.put(obj, "b", Value::from(2)).unwrap();
        rt.observe(&Value::Object(obj), false);

        let w = Watcher::new(
            &mut rt,
            move |rt| {
                if rt.get(obj, "flag").unwrap().as_bool() == Some(true) {
                    rt.get(obj, "a").unwrap()
                } else {
                    rt.get(obj, "b").unwrap()
                }
            },
            WatcherOptions::sync(),
        );
        let a = rt.property_dep(obj, "a").unwrap();
        assert!(a.has_subscriber(w.id()));

        rt.put(obj, "flag", Value::from(false)).unwrap();
        assert!(!a.has_subscriber(w.id()));
        assert_eq!(w.value(), Value::from(2));

        let runs = w.run_count();
        rt.put(obj, "a", Value::from(10)).unwrap();
        assert_eq!(w.run_count(), runs);
    }

    #[test]
    fn teardown_unsubscribes() {
        let mut rt = Runtime::new();
        let obj = counter_object(&mut rt, 1);
        let w = Watcher::new(&mut rt, move |rt| rt.get(obj, "count").unwrap(), WatcherOptions::sync());

        w.teardown();
        assert!(!w.is_active());
        assert_eq!(rt.property_dep(obj, "count").unwrap().subscriber_count(), 0);

        rt.put(obj, "count", Value::from(2)).unwrap();
        assert_eq!(w.run_count(), 1);
    }

    #[test]
    fn scheduler_receives_non_sync_watchers() {
        struct Queue(RefCell<Vec<Rc<Watcher>>>);
        impl Scheduler for Queue {
            fn queue(&self, watcher: Rc<Watcher>) {
                self.0.borrow_mut().push(watcher);
            }
        }

        let mut rt = Runtime::new();
        let obj = counter_object(&mut rt, 1);
        let queue = Rc::new(Queue(RefCell::new(Vec::new())));

        let options = WatcherOptions::default().with_scheduler(queue.clone());
        let w = Watcher::new(&mut rt, move |rt| rt.get(obj, "count").unwrap(), options);

        rt.put(obj, "count", Value::from(2)).unwrap();
        assert_eq!(w.run_count(), 1);
        assert_eq!(queue.0.borrow().len(), 1);

        let queued: Vec<_> = queue.0.borrow_mut().drain(..).collect();
        for watcher in queued {
            watcher.run(&mut rt);
        }
        assert_eq!(w.value(), Value::from(2));
    }

    #[test]
    fn computed_chain_forwards_deps() {
        let mut rt = Runtime::with_config(RuntimeConfig::synchronous());
        let obj = counter_object(&mut rt, 2);

        let doubled = Watcher::new(
            &mut rt,
            move |rt| {
                let n = rt.get(obj, "count").unwrap().as_number().unwrap_or(0.0);
                Value::from(n * 2.0)
            },
            WatcherOptions::lazy(),
        );

        let computed = Rc::clone(&doubled);
        let outer = Watcher::new(
            &mut rt,
            move |rt| {
                let value = if computed.is_dirty() {
                    computed.evaluate(rt)
                } else {
                    computed.value()
                };
                computed.depend(rt);
                value
            },
            WatcherOptions::sync(),
        );
        assert_eq!(outer.value(), Value::from(4));

        rt.put(obj, "count", Value::from(5)).unwrap();
        assert_eq!(outer.value(), Value::from(10));
    }

    #[test]
    fn nested_watchers_restore_outer_target() {
        let mut rt = Runtime::new();
        let obj = counter_object(&mut rt, 1);
        rt.put(obj, "other", Value::from(0)).unwrap();
        rt.define_reactive(obj, "other", None).unwrap();

        let inner_slot: Rc<RefCell<Option<Rc<Watcher>>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&inner_slot);
        let outer = Watcher::new(
            &mut rt,
            move |rt| {
                let inner = Watcher::new(rt, move |rt| rt.get(obj, "other").unwrap(), WatcherOptions::sync());
                *slot.borrow_mut() = Some(inner);
                rt.get(obj, "count").unwrap()
            },
            WatcherOptions::sync(),
        );

        let count = rt.property_dep(obj, "count").unwrap();
        let other = rt.property_dep(obj, "other").unwrap();
        assert!(count.has_subscriber(outer.id()));
        assert!(!other.has_subscriber(outer.id()));
        assert!(rt.active_target().is_none());
        assert!(inner_slot.borrow().is_some());
    }

    #[test]
    fn dropped_watchers_leave_no_registrations() {
        let mut rt = Runtime::new();
        let obj = counter_object(&mut rt, 0);
        let dep = rt.property_dep(obj, "count").unwrap();

        let kept = Watcher::new(&mut rt, move |rt| rt.get(obj, "count").unwrap(), WatcherOptions::sync());
        for _ in 0..1000 {
            let w = Watcher::new(&mut rt, move |rt| rt.get(obj, "count").unwrap(), WatcherOptions::sync());
            assert!(dep.has_subscriber(w.id()));
        }
        assert_eq!(dep.subscriber_ids(), vec![kept.id()]);

        rt.put(obj, "count", Value::from(1)).unwrap();
        assert_eq!(dep.subscriber_count(), 1);
        assert_eq!(kept.run_count(), 2);
    }
}
