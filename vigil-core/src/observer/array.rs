//! Array Facade
//!
//! Arrays cannot report index writes, so change tracking for arrays goes
//! through their seven structural operations instead: `push`, `pop`,
//! `shift`, `unshift`, `splice`, `sort` and `reverse`. Each one performs
//! the underlying operation, observes any inserted elements, and notifies
//! the array's own dep. Arrays without an observer behave like plain
//! vectors.
//!
//! Index reads and writes ([`IndexedSequence`]) are passed straight
//! through and never notify.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::graph::Container;
use crate::reactive::Runtime;
use crate::value::{ArrayRef, Primitive, Value, MAX_ARRAY_INDEX};

/// Index-backed access to a sequence.
pub trait IndexedSequence {
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Element at `index`, or `undefined` past the end.
    fn at(&self, index: usize) -> Result<Value>;

    /// Write an element in place, growing the sequence with `undefined` if
    /// needed. Not intercepted: no subscriber is notified.
    ///
    /// Fails with [`Error::IndexOutOfRange`](crate::Error::IndexOutOfRange)
    /// past the largest array index.
    fn set_index(&mut self, index: usize, value: Value) -> Result<()>;

    fn to_vec(&self) -> Result<Vec<Value>>;
}

/// Structural mutation of a sequence, with change notification.
pub trait StructuralSequence {
    /// Append elements, returning the new length.
    fn push(&mut self, items: impl IntoIterator<Item = Value>) -> Result<usize>;

    /// Remove the last element. `undefined` when empty.
    fn pop(&mut self) -> Result<Value>;

    /// Remove the first element. `undefined` when empty.
    fn shift(&mut self) -> Result<Value>;

    /// Prepend elements, returning the new length.
    fn unshift(&mut self, items: impl IntoIterator<Item = Value>) -> Result<usize>;

    /// Remove `delete_count` elements at `start` and insert `items` in
    /// their place. Both bounds are clamped to the sequence. Returns the
    /// removed elements.
    fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<Value>>;

    /// Stable sort with a caller-supplied ordering.
    fn sort_by(&mut self, compare: impl FnMut(&Value, &Value) -> Ordering) -> Result<()>;

    /// Stable sort by string conversion, `undefined` last.
    fn sort(&mut self) -> Result<()>;

    fn reverse(&mut self) -> Result<()>;
}

/// An array borrowed from a runtime.
pub struct ArrayFacade<'rt> {
    rt: &'rt mut Runtime,
    arr: ArrayRef,
}

impl Runtime {
    /// Borrow `arr` for reading and mutation.
    pub fn array(&mut self, arr: ArrayRef) -> ArrayFacade<'_> {
        ArrayFacade { rt: self, arr }
    }

    /// Host string conversion, used by the default sort order.
    pub fn display_string(&self, value: &Value) -> String {
        let mut seen = HashSet::new();
        display_inner(self, value, &mut seen)
    }
}

fn display_inner(rt: &Runtime, value: &Value, seen: &mut HashSet<ArrayRef>) -> String {
    match value {
        Value::Primitive(p) => p.to_string(),
        Value::Object(_) | Value::Node(_) => "[object Object]".to_owned(),
        Value::Array(arr) => {
            // a cycle joins as an empty string
            if !seen.insert(*arr) {
                return String::new();
            }
            let items = match rt.heap.get(arr.0) {
                Some(Container::Array(data)) => data.items.clone(),
                _ => Vec::new(),
            };
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::Primitive(Primitive::Undefined | Primitive::Null) => String::new(),
                    other => display_inner(rt, other, seen),
                })
                .collect();
            seen.remove(arr);
            parts.join(",")
        }
    }
}

impl ArrayFacade<'_> {
    /// The borrowed array.
    pub fn handle(&self) -> ArrayRef {
        self.arr
    }

    /// Run `op` on the raw elements, then observe `inserted` and notify if
    /// the array is observed.
    fn mutate<R>(&mut self, inserted: &[Value], op: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R> {
        let result = op(&mut self.rt.heap.array_mut(self.arr)?.items);

        if let Some(observer) = self.rt.observer_of(&Value::Array(self.arr)) {
            self.rt.observe_items(inserted);
            observer.dep().notify(self.rt);
        }

        Ok(result)
    }
}

impl IndexedSequence for ArrayFacade<'_> {
    fn len(&self) -> Result<usize> {
        Ok(self.rt.heap.array(self.arr)?.items.len())
    }

    fn at(&self, index: usize) -> Result<Value> {
        Ok(self
            .rt
            .heap
            .array(self.arr)?
            .items
            .get(index)
            .cloned()
            .unwrap_or_default())
    }

    fn set_index(&mut self, index: usize, value: Value) -> Result<()> {
        if index > MAX_ARRAY_INDEX {
            return Err(Error::IndexOutOfRange { index });
        }
        let items = &mut self.rt.heap.array_mut(self.arr)?.items;
        if index >= items.len() {
            let grow = index - items.len() + 1;
            items
                .try_reserve(grow)
                .map_err(|_| Error::IndexOutOfRange { index })?;
            items.resize(index + 1, Value::undefined());
        }
        items[index] = value;
        Ok(())
    }

    fn to_vec(&self) -> Result<Vec<Value>> {
        Ok(self.rt.heap.array(self.arr)?.items.clone())
    }
}

impl StructuralSequence for ArrayFacade<'_> {
    fn push(&mut self, items: impl IntoIterator<Item = Value>) -> Result<usize> {
        let items: Vec<Value> = items.into_iter().collect();
        self.mutate(&items, |v| {
            v.extend(items.iter().cloned());
            v.len()
        })
    }

    fn pop(&mut self) -> Result<Value> {
        self.mutate(&[], |v| v.pop().unwrap_or_default())
    }

    fn shift(&mut self) -> Result<Value> {
        self.mutate(&[], |v| {
            if v.is_empty() {
                Value::undefined()
            } else {
                v.remove(0)
            }
        })
    }

    fn unshift(&mut self, items: impl IntoIterator<Item = Value>) -> Result<usize> {
        let items: Vec<Value> = items.into_iter().collect();
        self.mutate(&items, |v| {
            v.splice(0..0, items.iter().cloned());
            v.len()
        })
    }

    fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<Value>> {
        let items: Vec<Value> = items.into_iter().collect();
        self.mutate(&items, |v| {
            let start = start.min(v.len());
            let end = start.saturating_add(delete_count).min(v.len());
            v.splice(start..end, items.iter().cloned()).collect()
        })
    }

    fn sort_by(&mut self, compare: impl FnMut(&Value, &Value) -> Ordering) -> Result<()> {
        self.mutate(&[], |v| v.sort_by(compare))
    }

    fn sort(&mut self) -> Result<()> {
        let mut keyed: Vec<(Option<String>, Value)> = self
            .to_vec()?
            .into_iter()
            .map(|item| {
                let key = (!item.is_undefined()).then(|| self.rt.display_string(&item));
                (key, item)
            })
            .collect();
        keyed.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        let sorted: Vec<Value> = keyed.into_iter().map(|(_, item)| item).collect();
        self.mutate(&[], move |v| *v = sorted)
    }

    fn reverse(&mut self) -> Result<()> {
        self.mutate(&[], |v| v.reverse())
    }
}
