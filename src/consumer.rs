use crate::callbacks::{self, Callbacks, Event};
use crate::message::Delivery;
use crate::options::BasicConsumeOptions;
use crate::protocol::AMQPClass;
use crate::types::{FieldTable, ShortString};

use std::fmt;

/// Receives what a subscription produces.
///
/// Any `FnMut(Delivery)` closure is a delegate; implement the trait directly
/// when cancellation matters.
pub trait ConsumerDelegate {
    fn on_new_delivery(&mut self, delivery: Delivery);

    /// The subscription ended, by our `basic.cancel` or the broker's.
    fn on_cancel(&mut self) {}
}

impl<F: FnMut(Delivery)> ConsumerDelegate for F {
    fn on_new_delivery(&mut self, delivery: Delivery) {
        self(delivery)
    }
}

/// A subscription on a queue, keyed by its consumer tag.
///
/// Built when `basic.consume-ok` assigns the tag; lives in its channel's
/// consumer table until cancelled.
pub struct Consumer {
    pub(crate) tag: ShortString,
    queue: ShortString,
    options: BasicConsumeOptions,
    arguments: FieldTable,
    delegate: Box<dyn ConsumerDelegate>,
    pub(crate) callbacks: Callbacks<Consumer>,
}

impl Consumer {
    pub(crate) fn new(
        tag: ShortString,
        queue: ShortString,
        options: BasicConsumeOptions,
        arguments: FieldTable,
        delegate: Box<dyn ConsumerDelegate>,
    ) -> Self {
        Self {
            tag,
            queue,
            options,
            arguments,
            delegate,
            callbacks: Callbacks::default(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn options(&self) -> &BasicConsumeOptions {
        &self.options
    }

    pub fn arguments(&self) -> &FieldTable {
        &self.arguments
    }

    pub fn on(&mut self, event: Event, callback: impl FnMut(&mut Consumer, &AMQPClass) + 'static) {
        self.callbacks.on(event, callback);
    }

    pub fn once(&mut self, event: Event, callback: impl FnOnce(&mut Consumer, &AMQPClass) + 'static) {
        self.callbacks.once(event, callback);
    }

    pub fn redefine(&mut self, event: Event, callback: impl FnMut(&mut Consumer, &AMQPClass) + 'static) {
        self.callbacks.redefine(event, callback);
    }

    pub(crate) fn new_delivery(&mut self, delivery: Delivery) {
        self.delegate.on_new_delivery(delivery);
    }

    /// Teardown without a cancel-ok: the channel or connection went away.
    pub(crate) fn interrupt(&mut self) {
        self.delegate.on_cancel();
    }

    pub(crate) fn cancel(&mut self, payload: &AMQPClass, broker_initiated: bool) {
        self.delegate.on_cancel();
        let event = if broker_initiated { Event::Cancel } else { Event::CancelOk };
        self.exec_callbacks(event, payload);
    }

    pub(crate) fn exec_callbacks(&mut self, event: Event, payload: &AMQPClass) {
        callbacks::emit(self, |consumer| &mut consumer.callbacks, event, payload);
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("tag", &self.tag)
            .field("queue", &self.queue)
            .field("options", &self.options)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
