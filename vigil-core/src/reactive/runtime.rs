//! Reactive Runtime
//!
//! The runtime is the evaluation context every reactive operation runs in.
//! It owns the data graph, the observer side table and the target stack,
//! and it is passed explicitly (`&mut Runtime`) to every read, write and
//! evaluation instead of living in hidden global state.
//!
//! # How It Works
//!
//! 1. Containers are allocated in the runtime's arena and addressed by
//!    typed handles.
//!
//! 2. `observe` instruments a container; the property interceptor and the
//!    array facade (see [`crate::observer`]) route reads and writes through
//!    deps.
//!
//! 3. Subscribers evaluate inside [`Runtime::with_target`], so reads made
//!    during the evaluation register them as dependents.
//!
//! # Thread Safety
//!
//! None. A runtime is confined to one logical thread; it is neither `Send`
//! nor `Sync`.

use std::rc::Rc;

use slotmap::SecondaryMap;

use super::context::TargetStack;
use super::subscriber::AnySubscriber;
use crate::config::RuntimeConfig;
use crate::error::{Result, Warning};
use crate::graph::{
    ArrayData, Container, Getter, Handle, Heap, NodeData, ObjectData, Property, PropertyFlags,
    Setter, Slot,
};
use crate::observer::Observer;
use crate::value::{ArrayRef, NodeRef, ObjectRef, Value};

type WarnHandler = Box<dyn FnMut(&Warning)>;

/// Owner of a data graph and its reactive bookkeeping.
pub struct Runtime {
    pub(crate) heap: Heap,
    /// Side table from container identity to its observer.
    pub(crate) observers: SecondaryMap<Handle, Observer>,
    targets: TargetStack,
    observing: bool,
    config: RuntimeConfig,
    warn_handler: Option<WarnHandler>,
}

impl Runtime {
    /// A runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// A runtime using `config`.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            heap: Heap::default(),
            observers: SecondaryMap::new(),
            targets: TargetStack::new(),
            observing: true,
            config,
            warn_handler: None,
        }
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Target stack
    // ------------------------------------------------------------------

    /// Begin an evaluation pass for `target`. `None` suspends tracking.
    pub fn push_target(&mut self, target: Option<AnySubscriber>) {
        self.targets.push(target);
    }

    /// End the innermost evaluation pass.
    pub fn pop_target(&mut self) {
        self.targets.pop();
    }

    /// The subscriber currently evaluating, if any.
    pub fn active_target(&self) -> Option<AnySubscriber> {
        self.targets.active()
    }

    /// The stack of subscribers under evaluation.
    pub fn targets(&self) -> &TargetStack {
        &self.targets
    }

    /// Run `f` with `target` active, restoring the previous target on every
    /// exit path.
    pub fn with_target<T>(
        &mut self,
        target: Option<AnySubscriber>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let _guard = self.targets.enter(target);
        f(self)
    }

    /// Run `f` without tracking any reads.
    pub fn untracked<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.with_target(None, f)
    }

    // ------------------------------------------------------------------
    // Observation switch and diagnostics
    // ------------------------------------------------------------------

    /// While false, `observe` creates no new observers.
    pub fn toggle_observing(&mut self, flag: bool) {
        self.observing = flag;
    }

    /// Whether `observe` may create new observers.
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Install a host hook that receives every warning.
    pub fn set_warn_handler(&mut self, handler: impl FnMut(&Warning) + 'static) {
        self.warn_handler = Some(Box::new(handler));
    }

    pub(crate) fn warn(&mut self, warning: Warning) {
        if !self.config.warnings {
            return;
        }
        tracing::warn!("{warning}");
        if let Some(handler) = self.warn_handler.as_mut() {
            handler(&warning);
        }
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// Allocate an empty, extensible plain object.
    pub fn new_object(&mut self) -> ObjectRef {
        ObjectRef(self.heap.insert(Container::Object(ObjectData::new(false))))
    }

    /// Allocate a framework instance. Instances are never observed and
    /// refuse structural additions and deletions.
    pub fn new_instance(&mut self) -> ObjectRef {
        ObjectRef(self.heap.insert(Container::Object(ObjectData::new(true))))
    }

    /// Allocate an array holding `items`.
    pub fn new_array(&mut self, items: impl IntoIterator<Item = Value>) -> ArrayRef {
        ArrayRef(self.heap.insert(Container::Array(ArrayData {
            items: items.into_iter().collect(),
            extensible: true,
        })))
    }

    /// Allocate a rendered node.
    pub fn new_node(&mut self, tag: &str, payload: Value) -> NodeRef {
        NodeRef(self.heap.insert(Container::Node(NodeData {
            tag: tag.into(),
            payload,
        })))
    }

    /// Tag of a rendered node.
    pub fn node_tag(&self, node: NodeRef) -> Result<Rc<str>> {
        Ok(Rc::clone(&self.heap.node(node)?.tag))
    }

    /// Payload of a rendered node.
    pub fn node_payload(&self, node: NodeRef) -> Result<Value> {
        Ok(self.heap.node(node)?.payload.clone())
    }

    /// Number of containers allocated in this runtime.
    pub fn container_count(&self) -> usize {
        self.heap.len()
    }

    // ------------------------------------------------------------------
    // Host object model
    // ------------------------------------------------------------------

    /// Define a plain data property.
    ///
    /// Redefining a non-configurable property, or adding a key to a
    /// non-extensible object, is ignored.
    pub fn define_property(
        &mut self,
        obj: ObjectRef,
        key: &str,
        value: Value,
        flags: PropertyFlags,
    ) -> Result<()> {
        self.install(
            obj,
            key,
            Property {
                slot: Slot::Data(value),
                flags,
            },
        )
    }

    /// Define a host accessor property. A getter without a setter makes the
    /// property read-only.
    pub fn define_accessor(
        &mut self,
        obj: ObjectRef,
        key: &str,
        get: Option<Getter>,
        set: Option<Setter>,
        flags: PropertyFlags,
    ) -> Result<()> {
        self.install(
            obj,
            key,
            Property {
                slot: Slot::Accessor { get, set },
                flags,
            },
        )
    }

    fn install(&mut self, obj: ObjectRef, key: &str, prop: Property) -> Result<()> {
        let data = self.heap.object_mut(obj)?;
        match data.props.get_mut(key) {
            Some(existing) if existing.flags.configurable => *existing = prop,
            Some(_) => {}
            None if data.extensible => {
                data.props.insert(key.into(), prop);
            }
            None => {}
        }
        Ok(())
    }

    /// Enumerable own keys in insertion order. Never tracked.
    pub fn keys(&self, obj: ObjectRef) -> Result<Vec<Rc<str>>> {
        Ok(self.heap.object(obj)?.keys())
    }

    /// Whether `obj` has an own property `key`, enumerable or not. Never tracked.
    pub fn has_own(&self, obj: ObjectRef, key: &str) -> Result<bool> {
        Ok(self.heap.object(obj)?.props.contains_key(key))
    }

    /// Forbid adding new keys or elements to a container.
    pub fn prevent_extensions(&mut self, value: &Value) {
        if let Some(container) = value.handle().and_then(|h| self.heap.get_mut(h)) {
            container.prevent_extensions();
        }
    }

    /// Whether new keys or elements may be added to `value`.
    pub fn is_extensible(&self, value: &Value) -> bool {
        value
            .handle()
            .and_then(|h| self.heap.get(h))
            .is_some_and(Container::is_extensible)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn runtime_starts_idle() {
        let rt = Runtime::new();
        assert!(rt.active_target().is_none());
        assert!(rt.is_observing());
        assert_eq!(rt.container_count(), 0);
    }

    #[test]
    fn non_configurable_properties_cannot_be_redefined() {
        let mut rt = Runtime::new();
        let obj = rt.new_object();
        rt.define_property(obj, "id", Value::from(1), PropertyFlags::non_configurable())
            .unwrap();
        rt.define_property(obj, "id", Value::from(2), PropertyFlags::default())
            .unwrap();

        assert_eq!(rt.get(obj, "id").unwrap(), Value::from(1));
    }

    #[test]
    fn non_extensible_objects_reject_new_keys() {
        let mut rt = Runtime::new();
        let obj = rt.new_object();
        rt.prevent_extensions(&Value::Object(obj));
        rt.define_property(obj, "late", Value::from(1), PropertyFlags::default())
            .unwrap();

        assert!(!rt.has_own(obj, "late").unwrap());
        assert!(!rt.is_extensible(&Value::Object(obj)));
    }

    #[test]
    fn warnings_reach_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut rt = Runtime::new();
        rt.set_warn_handler(move |w| sink.borrow_mut().push(w.clone()));
        rt.warn(Warning::AddRootKey { key: "x".into() });

        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn disabled_warnings_are_dropped() {
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);

        let mut rt = Runtime::with_config(RuntimeConfig {
            warnings: false,
            ..RuntimeConfig::default()
        });
        rt.set_warn_handler(move |_| *sink.borrow_mut() += 1);
        rt.warn(Warning::AddRootKey { key: "x".into() });

        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn nodes_keep_tag_and_payload() {
        let mut rt = Runtime::new();
        let node = rt.new_node("div", Value::from("text"));
        assert_eq!(rt.node_tag(node).unwrap().as_ref(), "div");
        assert_eq!(rt.node_payload(node).unwrap(), Value::from("text"));
    }
}
