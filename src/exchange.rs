use crate::callbacks::{self, Callbacks, Event};
use crate::options::ExchangeDeclareOptions;
use crate::protocol::AMQPClass;
use crate::types::{FieldTable, ShortString};

/// Type of an exchange. The unnamed (empty string) direct exchange is what
/// every queue is bound to by default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExchangeKind {
    Direct,
    Fanout,
    Headers,
    Topic,
    Custom(String),
}

impl ExchangeKind {
    pub fn kind(&self) -> &str {
        match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Headers => "headers",
            ExchangeKind::Topic => "topic",
            ExchangeKind::Custom(kind) => kind,
        }
    }
}

impl Default for ExchangeKind {
    fn default() -> Self {
        ExchangeKind::Direct
    }
}

#[derive(Debug)]
pub struct Exchange {
    name: ShortString,
    kind: ExchangeKind,
    options: ExchangeDeclareOptions,
    arguments: FieldTable,
    pub(crate) callbacks: Callbacks<Exchange>,
}

impl Exchange {
    pub fn new(
        name: impl Into<ShortString>,
        kind: ExchangeKind,
        options: ExchangeDeclareOptions,
        arguments: FieldTable,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            options,
            arguments,
            callbacks: Callbacks::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ExchangeKind {
        &self.kind
    }

    pub fn options(&self) -> &ExchangeDeclareOptions {
        &self.options
    }

    pub fn arguments(&self) -> &FieldTable {
        &self.arguments
    }

    pub fn on(&mut self, event: Event, callback: impl FnMut(&mut Exchange, &AMQPClass) + 'static) {
        self.callbacks.on(event, callback);
    }

    pub fn once(&mut self, event: Event, callback: impl FnOnce(&mut Exchange, &AMQPClass) + 'static) {
        self.callbacks.once(event, callback);
    }

    pub fn redefine(&mut self, event: Event, callback: impl FnMut(&mut Exchange, &AMQPClass) + 'static) {
        self.callbacks.redefine(event, callback);
    }

    pub(crate) fn exec_callbacks(&mut self, event: Event, payload: &AMQPClass) {
        callbacks::emit(self, |exchange| &mut exchange.callbacks, event, payload);
    }
}
