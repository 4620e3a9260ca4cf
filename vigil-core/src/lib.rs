//! Vigil Core
//!
//! This crate provides a fine-grained reactive dependency-tracking engine.
//! Given a mutable data graph of objects and arrays, it records which
//! computations read which properties and re-runs exactly those
//! computations when the properties change.
//!
//! It implements:
//!
//! - Observation of objects and arrays, with per-property interception
//! - Mutation-intercepting array operations
//! - Structural helpers for adding and deleting keys reactively
//! - A reference subscriber (`Watcher`) with dynamic dependency sets
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: The tagged value model and typed container handles
//! - `graph`: The arena holding every container
//! - `reactive`: Deps, subscribers, the target stack and the runtime
//! - `observer`: Observation, the property interceptor and the array facade
//! - `json`: Conversion to and from `serde_json` trees
//!
//! # Example
//!
//! ```rust
//! use vigil_core::reactive::{Runtime, Watcher, WatcherOptions};
//! use vigil_core::value::Value;
//!
//! let mut rt = Runtime::new();
//! let state = rt.from_json(&serde_json::json!({ "count": 1 }));
//! rt.observe(&state, true);
//! let obj = state.as_object().unwrap();
//!
//! let doubled = Watcher::new(
//!     &mut rt,
//!     move |rt| {
//!         let n = rt.get(obj, "count").unwrap().as_number().unwrap_or(0.0);
//!         Value::number(n * 2.0)
//!     },
//!     WatcherOptions::sync(),
//! );
//!
//! rt.put(obj, "count", Value::from(5)).unwrap();
//! assert_eq!(doubled.value(), Value::number(10.0));
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod json;
pub mod observer;
pub mod reactive;
pub mod value;

#[cfg(test)]
mod testing;

pub use config::RuntimeConfig;
pub use error::{Error, Result, Warning};
pub use observer::{DefineOptions, IndexedSequence, Observer, StructuralSequence};
pub use reactive::{Dep, Runtime, Subscriber, Watcher, WatcherOptions};
pub use value::{
    ArrayRef, NodeRef, ObjectRef, Primitive, PropertyKey, Value, ValueKind, MAX_ARRAY_INDEX,
};
