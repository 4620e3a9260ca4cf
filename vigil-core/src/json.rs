//! JSON Conversion
//!
//! Builds data graphs from `serde_json` trees and takes untracked snapshots
//! back out. Snapshots follow host serialization rules: `undefined`
//! properties are omitted, `undefined` array elements and non-finite
//! numbers become `null`, and observer bookkeeping never appears.

use std::collections::HashSet;

use serde_json::{Map, Number};

use crate::error::{Error, Result};
use crate::graph::{Handle, Property};
use crate::reactive::Runtime;
use crate::value::{Primitive, Value};

impl Runtime {
    /// Allocate the containers described by `json`. The result is not
    /// observed.
    pub fn from_json(&mut self, json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::null(),
            serde_json::Value::Bool(b) => Value::from(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or_else(Value::null, Value::number),
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => {
                let items: Vec<Value> = items.iter().map(|item| self.from_json(item)).collect();
                Value::Array(self.new_array(items))
            }
            serde_json::Value::Object(map) => {
                let obj = self.new_object();
                for (key, item) in map {
                    let value = self.from_json(item);
                    if let Ok(data) = self.heap.object_mut(obj) {
                        data.props.insert(key.as_str().into(), Property::data(value));
                    }
                }
                Value::Object(obj)
            }
        }
    }

    /// Snapshot `value` as JSON without registering any dependency.
    ///
    /// Shared containers are serialized once per occurrence; a container
    /// that contains itself is an error.
    pub fn to_json(&mut self, value: &Value) -> Result<serde_json::Value> {
        let mut path = HashSet::new();
        self.untracked(|rt| rt.snapshot(value, &mut path))
    }

    fn snapshot(&mut self, value: &Value, path: &mut HashSet<Handle>) -> Result<serde_json::Value> {
        let json = match value {
            Value::Primitive(p) => primitive_to_json(p),
            Value::Node(node) => {
                let tag = self.node_tag(*node)?;
                let payload = self.node_payload(*node)?;
                let mut map = Map::new();
                map.insert("tag".to_owned(), serde_json::Value::String(tag.to_string()));
                map.insert("payload".to_owned(), self.nested(&payload, node.0, path)?);
                serde_json::Value::Object(map)
            }
            Value::Array(arr) => {
                let items = self.heap.array(*arr)?.items.clone();
                self.enter(arr.0, path)?;
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(self.snapshot(item, path)?);
                }
                path.remove(&arr.0);
                serde_json::Value::Array(out)
            }
            Value::Object(obj) => {
                let keys = self.keys(*obj)?;
                self.enter(obj.0, path)?;
                let mut map = Map::new();
                for key in keys {
                    let item = self.get(*obj, &key)?;
                    if item.is_undefined() {
                        continue;
                    }
                    map.insert(key.to_string(), self.snapshot(&item, path)?);
                }
                path.remove(&obj.0);
                serde_json::Value::Object(map)
            }
        };
        Ok(json)
    }

    fn nested(&mut self, value: &Value, owner: Handle, path: &mut HashSet<Handle>) -> Result<serde_json::Value> {
        self.enter(owner, path)?;
        let json = self.snapshot(value, path);
        path.remove(&owner);
        json
    }

    fn enter(&self, handle: Handle, path: &mut HashSet<Handle>) -> Result<()> {
        if path.insert(handle) {
            Ok(())
        } else {
            Err(Error::CyclicValue)
        }
    }
}

fn primitive_to_json(p: &Primitive) -> serde_json::Value {
    match p {
        Primitive::Undefined | Primitive::Null => serde_json::Value::Null,
        Primitive::Bool(b) => serde_json::Value::Bool(*b),
        Primitive::Number(n) => number_to_json(*n),
        Primitive::Str(s) => serde_json::Value::String(s.to_string()),
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    // integral values keep an integer representation
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}
