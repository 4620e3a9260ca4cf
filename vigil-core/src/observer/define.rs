//! Property Interceptor
//!
//! `define_reactive` turns one object property into an intercepted slot.
//! Reads through [`Runtime::get`] register the active subscriber with the
//! slot's dep (and with the dep of the container stored in it). Writes
//! through [`Runtime::put`] commit the value, observe it if it is a
//! container, and notify the dep.
//!
//! Writes are suppressed when the new value is strictly equal to the old
//! one, or when both are NaN. A property with a preserved getter and no
//! setter is read-only: writes to it are ignored.

use std::rc::Rc;

use crate::error::Result;
use crate::graph::{CustomSetter, Getter, Property, PropertyFlags, ReactiveSlot, Setter, Slot};
use crate::reactive::{Dep, Runtime};
use crate::value::{ObjectRef, Value};

/// Optional behavior for [`Runtime::define_reactive_with`].
#[derive(Clone, Default)]
pub struct DefineOptions {
    /// Called on every write that passes change detection.
    pub custom_setter: Option<CustomSetter>,
    /// Leave the stored value unobserved.
    pub shallow: bool,
}

impl DefineOptions {
    /// Options that leave the property's value unobserved.
    pub fn shallow() -> Self {
        Self {
            shallow: true,
            ..Self::default()
        }
    }

    /// Options that call `setter` before each write that changes the value.
    pub fn with_custom_setter(setter: impl Fn() + 'static) -> Self {
        Self {
            custom_setter: Some(Rc::new(setter)),
            ..Self::default()
        }
    }
}

impl Runtime {
    /// Instrument `obj[key]`. With `value == None` the current value of the
    /// property is kept.
    pub fn define_reactive(&mut self, obj: ObjectRef, key: &str, value: Option<Value>) -> Result<()> {
        self.define_reactive_with(obj, key, value, DefineOptions::default())
    }

    pub fn define_reactive_with(
        &mut self,
        obj: ObjectRef,
        key: &str,
        value: Option<Value>,
        options: DefineOptions,
    ) -> Result<()> {
        let data = self.heap.object(obj)?;
        let existing = data.props.get(key);

        let (dep, getter, setter, raw) = match existing.map(|prop| (&prop.slot, prop.flags)) {
            Some((_, flags)) if !flags.configurable => return Ok(()),
            None if !data.extensible => return Ok(()),
            None => (Dep::new(), None, None, Value::undefined()),
            Some((Slot::Data(v), _)) => (Dep::new(), None, None, v.clone()),
            Some((Slot::Accessor { get, set }, _)) => {
                (Dep::new(), get.clone(), set.clone(), Value::undefined())
            }
            // keep the dep so existing subscribers stay wired
            Some((Slot::Reactive(slot), _)) => (
                slot.dep.clone(),
                slot.getter.clone(),
                slot.setter.clone(),
                slot.val.clone(),
            ),
        };

        let val = match (value, &getter) {
            (Some(value), _) => value,
            (None, Some(get)) => get(self),
            (None, None) => raw,
        };

        let child = if options.shallow {
            None
        } else {
            self.observe(&val, false)
        };

        let slot = ReactiveSlot {
            dep,
            val,
            getter,
            setter,
            custom_setter: options.custom_setter,
            shallow: options.shallow,
            child,
        };

        self.heap.object_mut(obj)?.props.insert(
            key.into(),
            Property {
                slot: Slot::Reactive(Box::new(slot)),
                flags: PropertyFlags::default(),
            },
        );
        Ok(())
    }

    /// Read `obj[key]`, registering the active subscriber if the property
    /// is reactive. Missing keys read as `undefined`.
    pub fn get(&mut self, obj: ObjectRef, key: &str) -> Result<Value> {
        let slot = match self.access(obj, key)? {
            Access::Missing => return Ok(Value::undefined()),
            Access::Data(value) => return Ok(value),
            Access::Host { get, .. } => {
                return Ok(get.map_or_else(Value::undefined, |get| get(self)));
            }
            Access::Reactive(slot) => slot,
        };

        let value = match &slot.getter {
            Some(get) => get(self),
            None => slot.val.clone(),
        };

        if self.active_target().is_some() {
            slot.dep.depend(self);
            if let Some(child) = &slot.child {
                child.dep().depend(self);
                if let Value::Array(arr) = &value {
                    self.depend_array(*arr);
                }
            }
        }

        Ok(value)
    }

    /// Assign `obj[key] = value`.
    ///
    /// Unknown keys on an extensible object become plain, non-reactive data
    /// properties; use [`Runtime::set`] to add a reactive key.
    pub fn put(&mut self, obj: ObjectRef, key: &str, value: Value) -> Result<()> {
        let slot = match self.access(obj, key)? {
            Access::Missing => {
                let data = self.heap.object_mut(obj)?;
                if data.extensible {
                    data.props.insert(key.into(), Property::data(value));
                }
                return Ok(());
            }
            Access::Data(_) => {
                if let Some(prop) = self.heap.object_mut(obj)?.props.get_mut(key) {
                    prop.slot = Slot::Data(value);
                }
                return Ok(());
            }
            Access::Host { set, .. } => {
                if let Some(set) = set {
                    set(self, value);
                }
                return Ok(());
            }
            Access::Reactive(slot) => slot,
        };

        let old = match &slot.getter {
            Some(get) => get(self),
            None => slot.val.clone(),
        };
        if value.strict_eq(&old) || (value.is_nan() && old.is_nan()) {
            return Ok(());
        }

        if let Some(custom) = &slot.custom_setter {
            custom();
        }

        match (&slot.getter, &slot.setter) {
            (Some(_), None) => return Ok(()),
            (_, Some(set)) => set(self, value.clone()),
            (None, None) => {
                if let Some(live) = self.reactive_slot_mut(obj, key) {
                    live.val = value.clone();
                }
            }
        }

        let child = if slot.shallow {
            None
        } else {
            self.observe(&value, false)
        };
        if let Some(live) = self.reactive_slot_mut(obj, key) {
            live.child = child;
        }

        slot.dep.notify(self);
        Ok(())
    }

    /// Snapshot of how `obj[key]` is stored, detached from the heap so
    /// host accessors can be called with the runtime.
    fn access(&self, obj: ObjectRef, key: &str) -> Result<Access> {
        let access = match self.heap.object(obj)?.props.get(key) {
            None => Access::Missing,
            Some(prop) => match &prop.slot {
                Slot::Data(value) => Access::Data(value.clone()),
                Slot::Accessor { get, set } => Access::Host {
                    get: get.clone(),
                    set: set.clone(),
                },
                Slot::Reactive(slot) => Access::Reactive(ReactiveSlot::clone(slot)),
            },
        };
        Ok(access)
    }

    /// The dep of a reactive property, if `obj[key]` is one.
    pub fn property_dep(&self, obj: ObjectRef, key: &str) -> Option<Dep> {
        match &self.heap.object(obj).ok()?.props.get(key)?.slot {
            Slot::Reactive(slot) => Some(slot.dep.clone()),
            _ => None,
        }
    }

    fn reactive_slot_mut(&mut self, obj: ObjectRef, key: &str) -> Option<&mut ReactiveSlot> {
        match &mut self.heap.object_mut(obj).ok()?.props.get_mut(key)?.slot {
            Slot::Reactive(slot) => Some(slot),
            _ => None,
        }
    }
}

enum Access {
    Missing,
    Data(Value),
    Host {
        get: Option<Getter>,
        set: Option<Setter>,
    },
    Reactive(ReactiveSlot),
}
