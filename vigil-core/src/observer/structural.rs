//! Structural Mutation Helpers
//!
//! The property interceptor only covers keys that existed when an object
//! was walked. [`Runtime::set`] and [`Runtime::del`] add and remove keys in
//! a way subscribers can see: new keys are instrumented and the owning
//! container's dep is notified. Array indices are routed through the
//! splice facade.

use crate::error::{Result, Warning};
use crate::observer::{IndexedSequence, StructuralSequence};
use crate::reactive::Runtime;
use crate::value::{ArrayRef, ObjectRef, PropertyKey, Value};

impl Runtime {
    /// Set `target[key] = value`, making a new key reactive.
    ///
    /// Adding a key to a framework instance, or to the root data of a live
    /// instance, is refused with a warning. Returns `value`.
    pub fn set(&mut self, target: &Value, key: impl Into<PropertyKey>, value: Value) -> Result<Value> {
        let key = key.into();
        match target {
            Value::Primitive(_) | Value::Node(_) => {
                self.warn(Warning::SetOnNonContainer { kind: target.kind() });
                Ok(value)
            }
            Value::Array(arr) => match key.as_index() {
                Some(index) => {
                    self.set_array_index(*arr, index, value.clone())?;
                    Ok(value)
                }
                None => {
                    self.warn(Warning::InvalidArrayKey { key: key.to_string() });
                    Ok(value)
                }
            },
            Value::Object(obj) => {
                self.set_object_key(*obj, &key.to_name(), value.clone())?;
                Ok(value)
            }
        }
    }

    fn set_array_index(&mut self, arr: ArrayRef, index: usize, value: Value) -> Result<()> {
        let mut facade = self.array(arr);
        let len = facade.len()?;
        if index > len {
            // grow without notifying; the splice below notifies once
            facade.set_index(index - 1, Value::undefined())?;
        }
        facade.splice(index, 1, [value])?;
        Ok(())
    }

    fn set_object_key(&mut self, obj: ObjectRef, key: &str, value: Value) -> Result<()> {
        if self.has_own(obj, key)? {
            return self.put(obj, key, value);
        }

        let target = Value::Object(obj);
        let observer = self.observer_of(&target);
        if self.is_instance(&target) || observer.as_ref().is_some_and(|ob| ob.vm_count() > 0) {
            self.warn(Warning::AddRootKey { key: key.to_owned() });
            return Ok(());
        }

        let Some(observer) = observer else {
            return self.put(obj, key, value);
        };

        self.define_reactive(obj, key, Some(value))?;
        tracing::debug!(dep = observer.dep().id().raw(), key, "added reactive key");
        observer.dep().notify(self);
        Ok(())
    }

    /// Delete `target[key]`, notifying subscribers of the owning container.
    ///
    /// Deleting a missing or non-configurable key does nothing.
    pub fn del(&mut self, target: &Value, key: impl Into<PropertyKey>) -> Result<()> {
        let key = key.into();
        match target {
            Value::Primitive(_) | Value::Node(_) => {
                self.warn(Warning::DeleteOnNonContainer { kind: target.kind() });
                Ok(())
            }
            Value::Array(arr) => match key.as_index() {
                Some(index) => {
                    self.array(*arr).splice(index, 1, [])?;
                    Ok(())
                }
                None => {
                    self.warn(Warning::InvalidArrayKey { key: key.to_string() });
                    Ok(())
                }
            },
            Value::Object(obj) => self.del_object_key(*obj, &key.to_name()),
        }
    }

    fn del_object_key(&mut self, obj: ObjectRef, key: &str) -> Result<()> {
        let target = Value::Object(obj);
        let observer = self.observer_of(&target);
        if self.is_instance(&target) || observer.as_ref().is_some_and(|ob| ob.vm_count() > 0) {
            self.warn(Warning::DeleteRootKey { key: key.to_owned() });
            return Ok(());
        }

        let data = self.heap.object_mut(obj)?;
        let removable = data.props.get(key).is_some_and(|prop| prop.flags.configurable);
        if !removable {
            return Ok(());
        }
        data.props.shift_remove(key);

        if let Some(observer) = observer {
            tracing::debug!(dep = observer.dep().id().raw(), key, "deleted reactive key");
            observer.dep().notify(self);
        }
        Ok(())
    }
}
