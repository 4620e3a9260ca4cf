//! Reactive Core
//!
//! This module implements dependency tracking: deps, subscribers, the
//! target stack and the runtime that ties them to the data graph.
//!
//! # Concepts
//!
//! ## Deps
//!
//! A [`Dep`] stands for one reactive location. Reading the location inside
//! an evaluation registers the evaluating subscriber with its dep; writing
//! the location notifies every registered subscriber.
//!
//! ## Subscribers
//!
//! A [`Subscriber`] is anything that can be re-run when a dep changes. Deps
//! hold subscribers weakly through [`AnySubscriber`], so dropping a
//! subscriber is enough to stop its notifications. [`Watcher`] is the
//! reference implementation.
//!
//! ## Target Stack
//!
//! The active subscriber is the top of the runtime's [`TargetStack`].
//! Evaluations nest: a subscriber evaluated from inside another pushes
//! itself, and the outer one becomes active again once the inner
//! evaluation returns.
//!
//! # Implementation Notes
//!
//! Tracking state lives on the [`Runtime`], which callers pass explicitly.
//! There is no thread-local or global register.

mod context;
mod dep;
mod runtime;
mod subscriber;
mod watcher;

pub use context::{TargetGuard, TargetStack};
pub use dep::{Dep, DepId};
pub use runtime::Runtime;
pub use subscriber::{AnySubscriber, Subscriber, SubscriberId};
pub use watcher::{Scheduler, WatchCallback, WatchGetter, Watcher, WatcherOptions};
