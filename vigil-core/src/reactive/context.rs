//! Target Stack
//!
//! The target stack tracks which subscriber is currently evaluating.
//! This enables automatic dependency tracking: when a reactive property is
//! read, the dep hands itself to the subscriber on top of the stack.
//!
//! # Implementation
//!
//! The stack belongs to a [`Runtime`](super::Runtime) rather than to the
//! thread, so every evaluation names the context it runs in. A `None`
//! entry suspends tracking without losing the outer target.
//!
//! This design supports nested evaluations (e.g. a computed value read by a
//! watcher re-evaluating its own getter): once the inner evaluation ends,
//! the outer subscriber is active again.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::AnySubscriber;

/// Stack of currently evaluating subscribers.
///
/// Cloning shares the stack, which is what lets a [`TargetGuard`] restore
/// it while the runtime is mutably borrowed elsewhere.
#[derive(Debug, Clone, Default)]
pub struct TargetStack {
    stack: Rc<RefCell<Vec<Option<AnySubscriber>>>>,
}

impl TargetStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `target` the active subscriber.
    pub fn push(&self, target: Option<AnySubscriber>) {
        self.stack.borrow_mut().push(target);
    }

    /// Restore the previously active subscriber. Popping an empty stack
    /// does nothing.
    pub fn pop(&self) {
        self.stack.borrow_mut().pop();
    }

    /// The subscriber on top of the stack, if any.
    pub fn active(&self) -> Option<AnySubscriber> {
        self.stack.borrow().last().cloned().flatten()
    }

    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Push `target` and return a guard that restores the stack on drop.
    pub fn enter(&self, target: Option<AnySubscriber>) -> TargetGuard {
        self.push(target);
        TargetGuard {
            stack: self.clone(),
            depth: self.depth(),
        }
    }
}

/// Guard that pops the target when dropped.
///
/// This ensures the stack is restored even if the evaluation returns early
/// or panics. Entries pushed above the guard and never popped are
/// discarded with it.
#[must_use = "the target is popped as soon as the guard is dropped"]
pub struct TargetGuard {
    stack: TargetStack,
    depth: usize,
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        let mut stack = self.stack.stack.borrow_mut();
        debug_assert!(
            stack.len() >= self.depth,
            "target stack popped below guard: expected depth {}, got {}",
            self.depth,
            stack.len()
        );
        stack.truncate(self.depth.saturating_sub(1));
    }
}
