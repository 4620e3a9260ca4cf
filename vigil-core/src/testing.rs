//! Test helpers shared by unit tests.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::reactive::{AnySubscriber, Dep, Runtime, Subscriber, SubscriberId};

/// Subscriber that registers with every dep handed to it and counts
/// notifications. Optionally appends its id to a shared log on update.
pub(crate) struct Recorder {
    id: SubscriberId,
    me: Weak<Recorder>,
    updates: Cell<usize>,
    log: Option<Rc<RefCell<Vec<SubscriberId>>>>,
}

impl Recorder {
    pub fn new() -> Rc<Self> {
        Self::build(None)
    }

    pub fn logging(log: &Rc<RefCell<Vec<SubscriberId>>>) -> Rc<Self> {
        Self::build(Some(Rc::clone(log)))
    }

    fn build(log: Option<Rc<RefCell<Vec<SubscriberId>>>>) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            id: SubscriberId::new(),
            me: me.clone(),
            updates: Cell::new(0),
            log,
        })
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn handle(&self) -> AnySubscriber {
        AnySubscriber::new(self.id, self.me.clone() as Weak<dyn Subscriber>)
    }

    pub fn updates(&self) -> usize {
        self.updates.get()
    }
}

impl Subscriber for Recorder {
    fn add_dep(&self, dep: &Dep) {
        dep.add_sub(self.handle());
    }

    fn update(&self, _rt: &mut Runtime) {
        self.updates.set(self.updates.get() + 1);
        if let Some(log) = &self.log {
            log.borrow_mut().push(self.id);
        }
    }
}
