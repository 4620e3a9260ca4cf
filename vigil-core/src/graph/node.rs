//! Graph Nodes
//!
//! This module defines the container types that live in the data graph:
//! objects with ordered property maps, arrays, and rendered nodes.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::observer::Observer;
use crate::reactive::{Dep, Runtime};
use crate::value::{Value, ValueKind};

/// Host getter. Receives the runtime so it may read other reactive values.
pub type Getter = Rc<dyn Fn(&mut Runtime) -> Value>;

/// Host setter.
pub type Setter = Rc<dyn Fn(&mut Runtime, Value)>;

/// Side-effecting hook run on every accepted write to a reactive property.
pub type CustomSetter = Rc<dyn Fn()>;

/// Descriptor flags of an own property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags {
    /// Visible to `keys`, observation walks and serialization.
    pub enumerable: bool,
    /// Can be redefined or deleted. Non-configurable properties are never
    /// instrumented.
    pub configurable: bool,
}

impl PropertyFlags {
    pub fn non_configurable() -> Self {
        Self {
            configurable: false,
            ..Self::default()
        }
    }

    pub fn hidden() -> Self {
        Self {
            enumerable: false,
            ..Self::default()
        }
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self {
            enumerable: true,
            configurable: true,
        }
    }
}

/// State of an instrumented property.
///
/// Cloning is cheap: every field is a handle or reference-counted.
#[derive(Clone)]
pub(crate) struct ReactiveSlot {
    pub dep: Dep,
    /// Current value when no host getter is preserved.
    pub val: Value,
    pub getter: Option<Getter>,
    pub setter: Option<Setter>,
    pub custom_setter: Option<CustomSetter>,
    pub shallow: bool,
    /// Observer of the value most recently stored in this slot.
    pub child: Option<Observer>,
}

pub(crate) enum Slot {
    Data(Value),
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
    },
    Reactive(Box<ReactiveSlot>),
}

pub(crate) struct Property {
    pub slot: Slot,
    pub flags: PropertyFlags,
}

impl Property {
    pub fn data(value: Value) -> Self {
        Self {
            slot: Slot::Data(value),
            flags: PropertyFlags::default(),
        }
    }
}

pub(crate) struct ObjectData {
    pub props: IndexMap<Rc<str>, Property>,
    pub extensible: bool,
    /// Marks a framework instance. Instances are never observed.
    pub instance: bool,
}

impl ObjectData {
    pub fn new(instance: bool) -> Self {
        Self {
            props: IndexMap::new(),
            extensible: true,
            instance,
        }
    }

    /// Enumerable own keys in insertion order.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.props
            .iter()
            .filter(|(_, prop)| prop.flags.enumerable)
            .map(|(key, _)| Rc::clone(key))
            .collect()
    }
}

pub(crate) struct ArrayData {
    pub items: Vec<Value>,
    pub extensible: bool,
}

pub(crate) struct NodeData {
    pub tag: Rc<str>,
    pub payload: Value,
}

/// A container in the data graph.
pub(crate) enum Container {
    Object(ObjectData),
    Array(ArrayData),
    Node(NodeData),
}

impl Container {
    pub fn kind(&self) -> ValueKind {
        match self {
            Container::Object(_) => ValueKind::Object,
            Container::Array(_) => ValueKind::Array,
            Container::Node(_) => ValueKind::Node,
        }
    }

    /// Plain objects and arrays are the only observable containers.
    pub fn is_plain(&self) -> bool {
        match self {
            Container::Object(data) => !data.instance,
            Container::Array(_) => true,
            Container::Node(_) => false,
        }
    }

    pub fn is_extensible(&self) -> bool {
        match self {
            Container::Object(data) => data.extensible,
            Container::Array(data) => data.extensible,
            Container::Node(_) => false,
        }
    }

    pub fn prevent_extensions(&mut self) {
        match self {
            Container::Object(data) => data.extensible = false,
            Container::Array(data) => data.extensible = false,
            Container::Node(_) => {}
        }
    }
}
