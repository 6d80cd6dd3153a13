use crate::protocol::basic::AMQPProperties;
use crate::types::{LongLongUInt, LongUInt, ShortString, ShortUInt};

/// A message delivered to a consumer or fetched with `basic.get`, fully
/// reassembled from its method, header and body frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub delivery_tag: LongLongUInt,
    pub exchange: ShortString,
    pub routing_key: ShortString,
    pub redelivered: bool,
    pub properties: AMQPProperties,
    pub data: Vec<u8>,
}

impl Delivery {
    pub(crate) fn new(
        delivery_tag: LongLongUInt,
        exchange: ShortString,
        routing_key: ShortString,
        redelivered: bool,
    ) -> Self {
        Self {
            delivery_tag,
            exchange,
            routing_key,
            redelivered,
            properties: AMQPProperties::default(),
            data: Vec::new(),
        }
    }

    pub(crate) fn receive_content(&mut self, data: Vec<u8>) {
        self.data.extend(data);
    }
}

/// Reply to `basic.get`, carrying the remaining queue depth next to the
/// message itself.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicGetMessage {
    pub delivery: Delivery,
    pub message_count: LongUInt,
}

/// An unroutable mandatory publish, bounced back by the broker.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicReturnMessage {
    pub delivery: Delivery,
    pub reply_code: ShortUInt,
    pub reply_text: ShortString,
}
