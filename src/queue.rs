use crate::callbacks::{self, Callbacks, Event};
use crate::options::QueueDeclareOptions;
use crate::protocol::AMQPClass;
use crate::types::{FieldTable, LongUInt, ShortString};

/// A queue as this client knows it.
///
/// Created locally, then declared; the broker-assigned name, message count
/// and consumer count come back on `queue.declare-ok`.
#[derive(Debug)]
pub struct Queue {
    pub(crate) name: ShortString,
    options: QueueDeclareOptions,
    arguments: FieldTable,
    pub(crate) message_count: LongUInt,
    pub(crate) consumer_count: LongUInt,
    pub(crate) callbacks: Callbacks<Queue>,
}

impl Queue {
    pub fn new(name: impl Into<ShortString>, options: QueueDeclareOptions, arguments: FieldTable) -> Self {
        Self {
            name: name.into(),
            options,
            arguments,
            message_count: 0,
            consumer_count: 0,
            callbacks: Callbacks::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &QueueDeclareOptions {
        &self.options
    }

    pub fn arguments(&self) -> &FieldTable {
        &self.arguments
    }

    /// Queue depth as of the last `declare-ok`.
    pub fn message_count(&self) -> LongUInt {
        self.message_count
    }

    pub fn consumer_count(&self) -> LongUInt {
        self.consumer_count
    }

    /// Registers a standing hook for one of this queue's lifecycle events.
    pub fn on(&mut self, event: Event, callback: impl FnMut(&mut Queue, &AMQPClass) + 'static) {
        self.callbacks.on(event, callback);
    }

    /// Registers a hook dropped after its first firing.
    pub fn once(&mut self, event: Event, callback: impl FnOnce(&mut Queue, &AMQPClass) + 'static) {
        self.callbacks.once(event, callback);
    }

    /// Replaces every hook for `event` with this one.
    pub fn redefine(&mut self, event: Event, callback: impl FnMut(&mut Queue, &AMQPClass) + 'static) {
        self.callbacks.redefine(event, callback);
    }

    pub(crate) fn exec_callbacks(&mut self, event: Event, payload: &AMQPClass) {
        callbacks::emit(self, |queue| &mut queue.callbacks, event, payload);
    }
}
