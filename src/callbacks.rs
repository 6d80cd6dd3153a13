//! The callback substrate shared by connections, channels, queues,
//! exchanges and consumers.
//!
//! Each entity owns one [`Callbacks`] registry: an insertion-ordered list of
//! `(event, slot)` pairs. A slot is either `Once` (a pending completion,
//! dropped after it fires) or `Many` (a standing hook, kept across firings).
//! Firing an event nobody registered for is a silent no-op.

use crate::protocol::AMQPClass;

use std::fmt;

/// Lifecycle events an entity can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Open,
    Close,
    Flow,
    Qos,
    Recover,
    TxSelect,
    TxCommit,
    TxRollback,
    Error,
    Blocked,
    Unblocked,
    DeclareOk,
    DeleteOk,
    BindOk,
    UnbindOk,
    PurgeOk,
    ConsumeOk,
    CancelOk,
    Cancel,
}

enum Slot<T> {
    Once(Box<dyn FnOnce(&mut T, &AMQPClass)>),
    Many(Box<dyn FnMut(&mut T, &AMQPClass)>),
}

/// Insertion-ordered event registry for an entity of type `T`.
pub struct Callbacks<T> {
    entries: Vec<(Event, Slot<T>)>,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> fmt::Debug for Callbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callbacks({})", self.entries.len())
    }
}

impl<T> Callbacks<T> {
    /// Appends a standing hook for `event`.
    pub fn on(&mut self, event: Event, callback: impl FnMut(&mut T, &AMQPClass) + 'static) {
        self.entries.push((event, Slot::Many(Box::new(callback))));
    }

    /// Appends a one-shot hook for `event`, dropped after it fires.
    pub fn once(&mut self, event: Event, callback: impl FnOnce(&mut T, &AMQPClass) + 'static) {
        self.entries.push((event, Slot::Once(Box::new(callback))));
    }

    /// Replaces every hook registered for `event` with a single standing one.
    pub fn redefine(&mut self, event: Event, callback: impl FnMut(&mut T, &AMQPClass) + 'static) {
        self.entries.retain(|(e, _)| *e != event);
        self.on(event, callback);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn take(&mut self, event: Event) -> Vec<Slot<T>> {
        let mut taken = Vec::new();
        let mut kept = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.0 == event {
                taken.push(entry.1);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        taken
    }
}

/// Fires every hook registered on `field(owner)` for `event`, in
/// registration order, passing the owner and the reply payload. `Once` hooks
/// are consumed, `Many` hooks are re-registered afterwards.
///
/// The matching hooks are detached from the registry while they run, so a
/// hook is free to mutate the owner, including registering further
/// callbacks.
pub(crate) fn emit<T>(
    owner: &mut T,
    field: fn(&mut T) -> &mut Callbacks<T>,
    event: Event,
    payload: &AMQPClass,
) {
    let slots = field(owner).take(event);
    let mut kept = Vec::new();
    for slot in slots {
        match slot {
            Slot::Once(callback) => callback(owner, payload),
            Slot::Many(mut callback) => {
                callback(owner, payload);
                kept.push(Slot::Many(callback));
            }
        }
    }
    let registry = field(owner);
    for slot in kept {
        registry.entries.push((event, slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{channel, AMQPClass};

    use std::cell::RefCell;
    use std::rc::Rc;

    struct Entity {
        callbacks: Callbacks<Entity>,
        hits: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Entity {
        fn new(hits: Rc<RefCell<Vec<&'static str>>>) -> Self {
            Self {
                callbacks: Callbacks::default(),
                hits,
            }
        }

        fn emit(&mut self, event: Event, payload: &AMQPClass) {
            emit(self, |e| &mut e.callbacks, event, payload);
        }
    }

    fn payload() -> AMQPClass {
        AMQPClass::Channel(channel::AMQPMethod::OpenOk(channel::OpenOk {}))
    }

    #[test]
    fn once_fires_then_drops() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut entity = Entity::new(hits.clone());
        entity.callbacks.once(Event::Open, |e: &mut Entity, _| e.hits.borrow_mut().push("once"));

        entity.emit(Event::Open, &payload());
        entity.emit(Event::Open, &payload());
        assert_eq!(*hits.borrow(), vec!["once"]);
        assert!(entity.callbacks.is_empty());
    }

    #[test]
    fn many_fires_every_time_in_order() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut entity = Entity::new(hits.clone());
        entity.callbacks.on(Event::Flow, |e: &mut Entity, _| e.hits.borrow_mut().push("first"));
        entity.callbacks.on(Event::Flow, |e: &mut Entity, _| e.hits.borrow_mut().push("second"));

        entity.emit(Event::Flow, &payload());
        entity.emit(Event::Flow, &payload());
        assert_eq!(*hits.borrow(), vec!["first", "second", "first", "second"]);
    }

    #[test]
    fn missing_event_is_a_noop() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut entity = Entity::new(hits.clone());
        entity.emit(Event::Error, &payload());
        assert!(hits.borrow().is_empty());
    }

    #[test]
    fn redefine_replaces_existing_hooks() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut entity = Entity::new(hits.clone());
        entity.callbacks.on(Event::Flow, |e: &mut Entity, _| e.hits.borrow_mut().push("old"));
        entity
            .callbacks
            .redefine(Event::Flow, |e: &mut Entity, _| e.hits.borrow_mut().push("new"));

        entity.emit(Event::Flow, &payload());
        assert_eq!(*hits.borrow(), vec!["new"]);
    }

    #[test]
    fn hooks_may_register_more_hooks() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut entity = Entity::new(hits.clone());
        entity.callbacks.once(Event::Open, |e: &mut Entity, _| {
            e.hits.borrow_mut().push("outer");
            e.callbacks.once(Event::Close, |e: &mut Entity, _| e.hits.borrow_mut().push("inner"));
        });

        entity.emit(Event::Open, &payload());
        entity.emit(Event::Close, &payload());
        assert_eq!(*hits.borrow(), vec!["outer", "inner"]);
    }
}
