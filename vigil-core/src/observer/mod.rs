//! Container Observation
//!
//! An [`Observer`] marks a container as reactive and owns the dep that
//! stands for the container itself: its shape, as opposed to any one
//! property. Objects get every enumerable key instrumented by the property
//! interceptor; arrays get the mutation facade and their elements observed
//! recursively.
//!
//! The link from container to observer lives in the runtime's side table,
//! keyed by handle. It is invisible to key enumeration and serialization,
//! and it makes observation idempotent.

mod array;
mod define;
mod structural;

pub use array::{ArrayFacade, IndexedSequence, StructuralSequence};
pub use define::DefineOptions;

use std::cell::Cell;
use std::collections::HashSet;
use std::fmt::Debug;
use std::rc::Rc;

use crate::graph::{Container, Handle};
use crate::reactive::{Dep, Runtime};
use crate::value::{ArrayRef, ObjectRef, Value};

struct ObserverInner {
    value: Value,
    dep: Dep,
    /// Number of root contexts using this container as their root data.
    vm_count: Cell<usize>,
}

/// Per-container reactive bookkeeping.
///
/// Cloning shares the same observer; equality is identity.
#[derive(Clone)]
pub struct Observer {
    inner: Rc<ObserverInner>,
}

impl Observer {
    fn new(value: Value) -> Self {
        Self {
            inner: Rc::new(ObserverInner {
                value,
                dep: Dep::new(),
                vm_count: Cell::new(0),
            }),
        }
    }

    /// The observed container.
    pub fn value(&self) -> &Value {
        &self.inner.value
    }

    /// Dep notified when the container's shape changes.
    pub fn dep(&self) -> &Dep {
        &self.inner.dep
    }

    /// Number of live instances using this container as root data.
    pub fn vm_count(&self) -> usize {
        self.inner.vm_count.get()
    }
}

impl PartialEq for Observer {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Observer {}

impl Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("value", &self.inner.value)
            .field("dep", &self.inner.dep)
            .field("vm_count", &self.vm_count())
            .finish()
    }
}

impl Runtime {
    /// Observe `value`, returning its observer.
    ///
    /// Returns the existing observer if the value is already observed.
    /// Returns `None` for primitives and nodes, for framework instances, for
    /// non-extensible containers and while observation is switched off.
    /// `as_root_data` counts one more root context using the container.
    pub fn observe(&mut self, value: &Value, as_root_data: bool) -> Option<Observer> {
        let handle = match value {
            Value::Object(obj) => obj.0,
            Value::Array(arr) => arr.0,
            Value::Primitive(_) | Value::Node(_) => return None,
        };

        let observer = match self.observers.get(handle) {
            Some(existing) => Some(existing.clone()),
            None if self.is_observing() && self.is_observable(handle) => {
                Some(self.create_observer(handle, value.clone()))
            }
            None => None,
        };

        if as_root_data {
            if let Some(observer) = &observer {
                observer.inner.vm_count.set(observer.vm_count() + 1);
            }
        }

        observer
    }

    /// Look up the observer of `value` without creating one.
    pub fn observer_of(&self, value: &Value) -> Option<Observer> {
        match value {
            Value::Object(_) | Value::Array(_) => {
                value.handle().and_then(|h| self.observers.get(h)).cloned()
            }
            Value::Primitive(_) | Value::Node(_) => None,
        }
    }

    fn is_observable(&self, handle: Handle) -> bool {
        self.heap
            .get(handle)
            .is_some_and(|c| c.is_plain() && c.is_extensible())
    }

    fn create_observer(&mut self, handle: Handle, value: Value) -> Observer {
        let observer = Observer::new(value.clone());
        // registered before descending so cycles find it
        self.observers.insert(handle, observer.clone());

        tracing::debug!(dep = observer.dep().id().raw(), kind = %value.kind(), "observing container");

        match value {
            Value::Array(arr) => {
                let items = self
                    .heap
                    .array(arr)
                    .map(|data| data.items.clone())
                    .unwrap_or_default();
                self.observe_items(&items);
            }
            Value::Object(obj) => self.walk(obj),
            Value::Primitive(_) | Value::Node(_) => {}
        }

        observer
    }

    /// Instrument every enumerable own key of `obj`.
    fn walk(&mut self, obj: ObjectRef) {
        let keys = match self.heap.object(obj) {
            Ok(data) => data.keys(),
            Err(_) => return,
        };
        for key in keys {
            if let Err(error) = self.define_reactive(obj, &key, None) {
                tracing::debug!(%error, key = %key, "skipping property");
            }
        }
    }

    pub(crate) fn observe_items(&mut self, items: &[Value]) {
        for item in items {
            self.observe(item, false);
        }
    }

    /// Register the active target with the observer of every element,
    /// recursing into nested arrays.
    pub(crate) fn depend_array(&self, arr: ArrayRef) {
        let mut seen = HashSet::new();
        self.depend_array_inner(arr, &mut seen);
    }

    fn depend_array_inner(&self, arr: ArrayRef, seen: &mut HashSet<ArrayRef>) {
        if !seen.insert(arr) {
            return;
        }
        let Ok(data) = self.heap.array(arr) else {
            return;
        };
        for item in data.items.clone() {
            if let Some(observer) = self.observer_of(&item) {
                observer.dep().depend(self);
            }
            if let Value::Array(inner) = item {
                self.depend_array_inner(inner, seen);
            }
        }
    }

    pub(crate) fn is_instance(&self, value: &Value) -> bool {
        matches!(
            value.handle().and_then(|h| self.heap.get(h)),
            Some(Container::Object(data)) if data.instance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn observe_is_idempotent() {
        let mut rt = Runtime::new();
        let obj = rt.new_object();
        let value = Value::Object(obj);

        let first = rt.observe(&value, false).unwrap();
        let second = rt.observe(&value, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(rt.observer_of(&value), Some(first));
    }

    #[test]
    fn back_reference_is_invisible() {
        let mut rt = Runtime::new();
        let obj = rt.new_object();
        rt.put(obj, "a", Value::from(1)).unwrap();
        rt.observe(&Value::Object(obj), false);

        let keys: Vec<String> = rt.keys(obj).unwrap().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a"]);
    }

    #[test]
    fn primitives_and_nodes_are_not_observed() {
        let mut rt = Runtime::new();
        let node = rt.new_node("div", Value::undefined());

        assert!(rt.observe(&Value::from(1), false).is_none());
        assert!(rt.observe(&Value::Node(node), false).is_none());
    }

    #[test]
    fn instances_are_not_observed() {
        let mut rt = Runtime::new();
        let instance = rt.new_instance();
        assert!(rt.observe(&Value::Object(instance), false).is_none());
    }

    #[test]
    fn non_extensible_values_are_not_observed() {
        let mut rt = Runtime::new();
        let arr = rt.new_array([Value::from(1)]);
        rt.prevent_extensions(&Value::Array(arr));
        assert!(rt.observe(&Value::Array(arr), false).is_none());
    }

    #[test]
    fn toggle_observing_suspends_observation() {
        let mut rt = Runtime::new();
        let obj = rt.new_object();

        rt.toggle_observing(false);
        assert!(rt.observe(&Value::Object(obj), false).is_none());

        rt.toggle_observing(true);
        assert!(rt.observe(&Value::Object(obj), false).is_some());
    }

    #[test]
    fn already_observed_survives_toggle() {
        let mut rt = Runtime::new();
        let obj = rt.new_object();
        let first = rt.observe(&Value::Object(obj), false).unwrap();

        rt.toggle_observing(false);
        assert_eq!(rt.observe(&Value::Object(obj), false), Some(first));
    }

    #[test]
    fn root_data_is_counted() {
        let mut rt = Runtime::new();
        let obj = rt.new_object();
        let value = Value::Object(obj);

        rt.observe(&value, true);
        let observer = rt.observe(&value, true).unwrap();
        assert_eq!(observer.vm_count(), 2);
    }

    #[test]
    fn nested_containers_are_observed() {
        let mut rt = Runtime::new();
        let inner = rt.new_object();
        let list = rt.new_array([Value::Object(inner)]);
        let outer = rt.new_object();
        rt.put(outer, "list", Value::Array(list)).unwrap();

        rt.observe(&Value::Object(outer), false);

        assert!(rt.observer_of(&Value::Array(list)).is_some());
        assert!(rt.observer_of(&Value::Object(inner)).is_some());
    }

    #[test]
    fn self_referencing_object_terminates() {
        let mut rt = Runtime::new();
        let obj = rt.new_object();
        rt.put(obj, "me", Value::Object(obj)).unwrap();

        let observer = rt.observe(&Value::Object(obj), false).unwrap();
        assert_eq!(rt.observer_of(&Value::Object(obj)), Some(observer));
    }
}
