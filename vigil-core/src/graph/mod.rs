//! Data Graph
//!
//! This module implements the arena that holds every object, array and
//! rendered node the runtime knows about.
//!
//! # Overview
//!
//! Containers are stored in a `SlotMap` and referenced by [`Handle`]. A
//! handle is a stable identity: it never changes while the container is
//! alive and two values refer to the same container exactly when their
//! handles are equal. This identity keys the observer side table, so
//! observation state never has to be smuggled into the value itself.
//!
//! # Design Decisions
//!
//! 1. Containers live as long as their runtime. Nothing is collected.
//!
//! 2. Object properties keep insertion order, matching host key
//!    enumeration order.

mod node;

pub use node::{CustomSetter, Getter, PropertyFlags, Setter};
pub(crate) use node::{ArrayData, Container, NodeData, ObjectData, Property, ReactiveSlot, Slot};

use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::value::{ArrayRef, NodeRef, ObjectRef, ValueKind};

slotmap::new_key_type! {
    /// Stable identity of a container in the data graph.
    pub struct Handle;
}

/// Arena of containers.
#[derive(Default)]
pub(crate) struct Heap {
    containers: SlotMap<Handle, Container>,
}

impl Heap {
    pub fn insert(&mut self, container: Container) -> Handle {
        self.containers.insert(container)
    }

    pub fn get(&self, handle: Handle) -> Option<&Container> {
        self.containers.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Container> {
        self.containers.get_mut(handle)
    }

    pub fn object(&self, obj: ObjectRef) -> Result<&ObjectData> {
        match self.get(obj.0) {
            Some(Container::Object(data)) => Ok(data),
            Some(other) => Err(mismatch(ValueKind::Object, other)),
            None => Err(Error::DanglingHandle),
        }
    }

    pub fn object_mut(&mut self, obj: ObjectRef) -> Result<&mut ObjectData> {
        match self.get_mut(obj.0) {
            Some(Container::Object(data)) => Ok(data),
            Some(other) => Err(mismatch(ValueKind::Object, other)),
            None => Err(Error::DanglingHandle),
        }
    }

    pub fn array(&self, arr: ArrayRef) -> Result<&ArrayData> {
        match self.get(arr.0) {
            Some(Container::Array(data)) => Ok(data),
            Some(other) => Err(mismatch(ValueKind::Array, other)),
            None => Err(Error::DanglingHandle),
        }
    }

    pub fn array_mut(&mut self, arr: ArrayRef) -> Result<&mut ArrayData> {
        match self.get_mut(arr.0) {
            Some(Container::Array(data)) => Ok(data),
            Some(other) => Err(mismatch(ValueKind::Array, other)),
            None => Err(Error::DanglingHandle),
        }
    }

    pub fn node(&self, node: NodeRef) -> Result<&NodeData> {
        match self.get(node.0) {
            Some(Container::Node(data)) => Ok(data),
            Some(other) => Err(mismatch(ValueKind::Node, other)),
            None => Err(Error::DanglingHandle),
        }
    }

    /// Get the total number of containers in the graph.
    pub fn len(&self) -> usize {
        self.containers.len()
    }
}

fn mismatch(expected: ValueKind, found: &Container) -> Error {
    Error::KindMismatch {
        expected,
        found: found.kind(),
    }
}
