//! The AMQP 0.9.1 method table, hand-written for the client side of the
//! protocol.
//!
//! Every method this crate can send or receive has a struct in its class
//! module, an entry in the per-class `AMQPMethod` enum and a branch in the
//! crate-wide [`AMQPClass`] codec. Wire layout is big-endian, consecutive
//! bit arguments are packed into a single octet and reserved arguments are
//! emitted and skipped without being surfaced.

use crate::error::{Error, Result};
use crate::types::*;

use std::fmt;

pub mod constants {
    pub const PROTOCOL_HEADER: &[u8] = b"AMQP\x00\x00\x09\x01";
    pub const FRAME_END: u8 = 0xCE;

    pub const FRAME_METHOD: u8 = 1;
    pub const FRAME_HEADER: u8 = 2;
    pub const FRAME_BODY: u8 = 3;
    pub const FRAME_HEARTBEAT: u8 = 8;

    pub const REPLY_SUCCESS: u16 = 200;

    pub const CLASS_CONNECTION: u16 = 10;
    pub const CLASS_CHANNEL: u16 = 20;
    pub const CLASS_EXCHANGE: u16 = 40;
    pub const CLASS_QUEUE: u16 = 50;
    pub const CLASS_BASIC: u16 = 60;
    pub const CLASS_TX: u16 = 90;

    pub const CONNECTION_START: u16 = 10;
    pub const CONNECTION_START_OK: u16 = 11;
    pub const CONNECTION_SECURE: u16 = 20;
    pub const CONNECTION_SECURE_OK: u16 = 21;
    pub const CONNECTION_TUNE: u16 = 30;
    pub const CONNECTION_TUNE_OK: u16 = 31;
    pub const CONNECTION_OPEN: u16 = 40;
    pub const CONNECTION_OPEN_OK: u16 = 41;
    pub const CONNECTION_CLOSE: u16 = 50;
    pub const CONNECTION_CLOSE_OK: u16 = 51;
    pub const CONNECTION_BLOCKED: u16 = 60;
    pub const CONNECTION_UNBLOCKED: u16 = 61;

    pub const CHANNEL_OPEN: u16 = 10;
    pub const CHANNEL_OPEN_OK: u16 = 11;
    pub const CHANNEL_FLOW: u16 = 20;
    pub const CHANNEL_FLOW_OK: u16 = 21;
    pub const CHANNEL_CLOSE: u16 = 40;
    pub const CHANNEL_CLOSE_OK: u16 = 41;

    pub const EXCHANGE_DECLARE: u16 = 10;
    pub const EXCHANGE_DECLARE_OK: u16 = 11;
    pub const EXCHANGE_DELETE: u16 = 20;
    pub const EXCHANGE_DELETE_OK: u16 = 21;

    pub const QUEUE_DECLARE: u16 = 10;
    pub const QUEUE_DECLARE_OK: u16 = 11;
    pub const QUEUE_BIND: u16 = 20;
    pub const QUEUE_BIND_OK: u16 = 21;
    pub const QUEUE_PURGE: u16 = 30;
    pub const QUEUE_PURGE_OK: u16 = 31;
    pub const QUEUE_DELETE: u16 = 40;
    pub const QUEUE_DELETE_OK: u16 = 41;
    pub const QUEUE_UNBIND: u16 = 50;
    pub const QUEUE_UNBIND_OK: u16 = 51;

    pub const BASIC_QOS: u16 = 10;
    pub const BASIC_QOS_OK: u16 = 11;
    pub const BASIC_CONSUME: u16 = 20;
    pub const BASIC_CONSUME_OK: u16 = 21;
    pub const BASIC_CANCEL: u16 = 30;
    pub const BASIC_CANCEL_OK: u16 = 31;
    pub const BASIC_PUBLISH: u16 = 40;
    pub const BASIC_RETURN: u16 = 50;
    pub const BASIC_DELIVER: u16 = 60;
    pub const BASIC_GET: u16 = 70;
    pub const BASIC_GET_OK: u16 = 71;
    pub const BASIC_GET_EMPTY: u16 = 72;
    pub const BASIC_ACK: u16 = 80;
    pub const BASIC_REJECT: u16 = 90;
    pub const BASIC_RECOVER: u16 = 110;
    pub const BASIC_RECOVER_OK: u16 = 111;
    pub const BASIC_NACK: u16 = 120;

    pub const TX_SELECT: u16 = 10;
    pub const TX_SELECT_OK: u16 = 11;
    pub const TX_COMMIT: u16 = 20;
    pub const TX_COMMIT_OK: u16 = 21;
    pub const TX_ROLLBACK: u16 = 30;
    pub const TX_ROLLBACK_OK: u16 = 31;
}

use self::constants::*;

/// An error assigned to one of the protocol reply codes the broker can
/// report in `connection.close` and `channel.close`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AMQPError {
    kind: AMQPErrorKind,
    message: ShortString,
}

impl AMQPError {
    pub fn new(kind: AMQPErrorKind, message: ShortString) -> Self {
        Self { kind, message }
    }

    pub fn from_id(id: ShortUInt, message: ShortString) -> Option<Self> {
        AMQPErrorKind::from_id(id).map(|kind| Self { kind, message })
    }

    pub fn kind(&self) -> &AMQPErrorKind {
        &self.kind
    }

    pub fn get_id(&self) -> ShortUInt {
        self.kind.get_id()
    }

    pub fn get_message(&self) -> &ShortString {
        &self.message
    }
}

impl fmt::Display for AMQPError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AMQPErrorKind {
    Soft(AMQPSoftError),
    Hard(AMQPHardError),
}

impl AMQPErrorKind {
    pub fn get_id(&self) -> ShortUInt {
        match self {
            AMQPErrorKind::Soft(e) => e.get_id(),
            AMQPErrorKind::Hard(e) => e.get_id(),
        }
    }

    pub fn from_id(id: ShortUInt) -> Option<Self> {
        AMQPSoftError::from_id(id)
            .map(AMQPErrorKind::Soft)
            .or_else(|| AMQPHardError::from_id(id).map(AMQPErrorKind::Hard))
    }
}

impl From<AMQPSoftError> for AMQPErrorKind {
    fn from(e: AMQPSoftError) -> Self {
        AMQPErrorKind::Soft(e)
    }
}

impl From<AMQPHardError> for AMQPErrorKind {
    fn from(e: AMQPHardError) -> Self {
        AMQPErrorKind::Hard(e)
    }
}

/// Errors that close the channel they occurred on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AMQPSoftError {
    CONTENTTOOLARGE,
    NOROUTE,
    NOCONSUMERS,
    ACCESSREFUSED,
    NOTFOUND,
    RESOURCELOCKED,
    PRECONDITIONFAILED,
}

impl AMQPSoftError {
    pub fn get_id(&self) -> ShortUInt {
        match self {
            AMQPSoftError::CONTENTTOOLARGE => 311,
            AMQPSoftError::NOROUTE => 312,
            AMQPSoftError::NOCONSUMERS => 313,
            AMQPSoftError::ACCESSREFUSED => 403,
            AMQPSoftError::NOTFOUND => 404,
            AMQPSoftError::RESOURCELOCKED => 405,
            AMQPSoftError::PRECONDITIONFAILED => 406,
        }
    }

    pub fn from_id(id: ShortUInt) -> Option<Self> {
        match id {
            311 => Some(AMQPSoftError::CONTENTTOOLARGE),
            312 => Some(AMQPSoftError::NOROUTE),
            313 => Some(AMQPSoftError::NOCONSUMERS),
            403 => Some(AMQPSoftError::ACCESSREFUSED),
            404 => Some(AMQPSoftError::NOTFOUND),
            405 => Some(AMQPSoftError::RESOURCELOCKED),
            406 => Some(AMQPSoftError::PRECONDITIONFAILED),
            _ => None,
        }
    }
}

/// Errors that close the whole connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AMQPHardError {
    CONNECTIONFORCED,
    INVALIDPATH,
    FRAMEERROR,
    SYNTAXERROR,
    COMMANDINVALID,
    CHANNELERROR,
    UNEXPECTEDFRAME,
    RESOURCEERROR,
    NOTALLOWED,
    NOTIMPLEMENTED,
    INTERNALERROR,
}

impl AMQPHardError {
    pub fn get_id(&self) -> ShortUInt {
        match self {
            AMQPHardError::CONNECTIONFORCED => 320,
            AMQPHardError::INVALIDPATH => 402,
            AMQPHardError::FRAMEERROR => 501,
            AMQPHardError::SYNTAXERROR => 502,
            AMQPHardError::COMMANDINVALID => 503,
            AMQPHardError::CHANNELERROR => 504,
            AMQPHardError::UNEXPECTEDFRAME => 505,
            AMQPHardError::RESOURCEERROR => 506,
            AMQPHardError::NOTALLOWED => 530,
            AMQPHardError::NOTIMPLEMENTED => 540,
            AMQPHardError::INTERNALERROR => 541,
        }
    }

    pub fn from_id(id: ShortUInt) -> Option<Self> {
        match id {
            320 => Some(AMQPHardError::CONNECTIONFORCED),
            402 => Some(AMQPHardError::INVALIDPATH),
            501 => Some(AMQPHardError::FRAMEERROR),
            502 => Some(AMQPHardError::SYNTAXERROR),
            503 => Some(AMQPHardError::COMMANDINVALID),
            504 => Some(AMQPHardError::CHANNELERROR),
            505 => Some(AMQPHardError::UNEXPECTEDFRAME),
            506 => Some(AMQPHardError::RESOURCEERROR),
            530 => Some(AMQPHardError::NOTALLOWED),
            540 => Some(AMQPHardError::NOTIMPLEMENTED),
            541 => Some(AMQPHardError::INTERNALERROR),
        _ => None,
        }
    }
}

/// A decoded method frame payload.
#[derive(Clone, Debug, PartialEq)]
pub enum AMQPClass {
    Connection(connection::AMQPMethod),
    Channel(channel::AMQPMethod),
    Exchange(exchange::AMQPMethod),
    Queue(queue::AMQPMethod),
    Basic(basic::AMQPMethod),
    Tx(tx::AMQPMethod),
}

pub mod connection {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum AMQPMethod {
        Start(Start),
        StartOk(StartOk),
        Secure(Secure),
        SecureOk(SecureOk),
        Tune(Tune),
        TuneOk(TuneOk),
        Open(Open),
        OpenOk(OpenOk),
        Close(Close),
        CloseOk(CloseOk),
        Blocked(Blocked),
        Unblocked(Unblocked),
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Start {
        pub version_major: u8,
        pub version_minor: u8,
        pub server_properties: FieldTable,
        pub mechanisms: LongString,
        pub locales: LongString,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct StartOk {
        pub client_properties: FieldTable,
        pub mechanism: ShortString,
        pub response: LongString,
        pub locale: ShortString,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Secure {
        pub challenge: LongString,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct SecureOk {
        pub response: LongString,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Tune {
        pub channel_max: ShortUInt,
        pub frame_max: LongUInt,
        pub heartbeat: ShortUInt,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct TuneOk {
        pub channel_max: ShortUInt,
        pub frame_max: LongUInt,
        pub heartbeat: ShortUInt,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Open {
        pub virtual_host: ShortString,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct OpenOk {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct Close {
        pub reply_code: ShortUInt,
        pub reply_text: ShortString,
        pub class_id: ShortUInt,
        pub method_id: ShortUInt,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct CloseOk {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct Blocked {
        pub reason: ShortString,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Unblocked {}
}

pub mod channel {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum AMQPMethod {
        Open(Open),
        OpenOk(OpenOk),
        Flow(Flow),
        FlowOk(FlowOk),
        Close(Close),
        CloseOk(CloseOk),
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Open {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct OpenOk {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct Flow {
        pub active: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct FlowOk {
        pub active: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Close {
        pub reply_code: ShortUInt,
        pub reply_text: ShortString,
        pub class_id: ShortUInt,
        pub method_id: ShortUInt,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct CloseOk {}
}

pub mod exchange {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum AMQPMethod {
        Declare(Declare),
        DeclareOk(DeclareOk),
        Delete(Delete),
        DeleteOk(DeleteOk),
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Declare {
        pub exchange: ShortString,
        pub kind: ShortString,
        pub passive: Boolean,
        pub durable: Boolean,
        pub auto_delete: Boolean,
        pub internal: Boolean,
        pub nowait: Boolean,
        pub arguments: FieldTable,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct DeclareOk {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct Delete {
        pub exchange: ShortString,
        pub if_unused: Boolean,
        pub nowait: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct DeleteOk {}
}

pub mod queue {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum AMQPMethod {
        Declare(Declare),
        DeclareOk(DeclareOk),
        Bind(Bind),
        BindOk(BindOk),
        Purge(Purge),
        PurgeOk(PurgeOk),
        Delete(Delete),
        DeleteOk(DeleteOk),
        Unbind(Unbind),
        UnbindOk(UnbindOk),
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Declare {
        pub queue: ShortString,
        pub passive: Boolean,
        pub durable: Boolean,
        pub exclusive: Boolean,
        pub auto_delete: Boolean,
        pub nowait: Boolean,
        pub arguments: FieldTable,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct DeclareOk {
        pub queue: ShortString,
        pub message_count: LongUInt,
        pub consumer_count: LongUInt,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Bind {
        pub queue: ShortString,
        pub exchange: ShortString,
        pub routing_key: ShortString,
        pub nowait: Boolean,
        pub arguments: FieldTable,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct BindOk {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct Purge {
        pub queue: ShortString,
        pub nowait: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct PurgeOk {
        pub message_count: LongUInt,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Delete {
        pub queue: ShortString,
        pub if_unused: Boolean,
        pub if_empty: Boolean,
        pub nowait: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct DeleteOk {
        pub message_count: LongUInt,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Unbind {
        pub queue: ShortString,
        pub exchange: ShortString,
        pub routing_key: ShortString,
        pub arguments: FieldTable,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct UnbindOk {}
}

pub mod basic {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub enum AMQPMethod {
        Qos(Qos),
        QosOk(QosOk),
        Consume(Consume),
        ConsumeOk(ConsumeOk),
        Cancel(Cancel),
        CancelOk(CancelOk),
        Publish(Publish),
        Return(Return),
        Deliver(Deliver),
        Get(Get),
        GetOk(GetOk),
        GetEmpty(GetEmpty),
        Ack(Ack),
        Reject(Reject),
        Recover(Recover),
        RecoverOk(RecoverOk),
        Nack(Nack),
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Qos {
        pub prefetch_size: LongUInt,
        pub prefetch_count: ShortUInt,
        pub global: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct QosOk {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct Consume {
        pub queue: ShortString,
        pub consumer_tag: ShortString,
        pub no_local: Boolean,
        pub no_ack: Boolean,
        pub exclusive: Boolean,
        pub nowait: Boolean,
        pub arguments: FieldTable,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct ConsumeOk {
        pub consumer_tag: ShortString,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Cancel {
        pub consumer_tag: ShortString,
        pub nowait: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct CancelOk {
        pub consumer_tag: ShortString,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Publish {
        pub exchange: ShortString,
        pub routing_key: ShortString,
        pub mandatory: Boolean,
        pub immediate: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Return {
        pub reply_code: ShortUInt,
        pub reply_text: ShortString,
        pub exchange: ShortString,
        pub routing_key: ShortString,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Deliver {
        pub consumer_tag: ShortString,
        pub delivery_tag: LongLongUInt,
        pub redelivered: Boolean,
        pub exchange: ShortString,
        pub routing_key: ShortString,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Get {
        pub queue: ShortString,
        pub no_ack: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct GetOk {
        pub delivery_tag: LongLongUInt,
        pub redelivered: Boolean,
        pub exchange: ShortString,
        pub routing_key: ShortString,
        pub message_count: LongUInt,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct GetEmpty {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct Ack {
        pub delivery_tag: LongLongUInt,
        pub multiple: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Reject {
        pub delivery_tag: LongLongUInt,
        pub requeue: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Recover {
        pub requeue: Boolean,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct RecoverOk {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct Nack {
        pub delivery_tag: LongLongUInt,
        pub multiple: Boolean,
        pub requeue: Boolean,
    }

    /// Content header properties for the basic class.
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct AMQPProperties {
        content_type: Option<ShortString>,
        content_encoding: Option<ShortString>,
        headers: Option<FieldTable>,
        delivery_mode: Option<u8>,
        priority: Option<u8>,
        correlation_id: Option<ShortString>,
        reply_to: Option<ShortString>,
        expiration: Option<ShortString>,
        message_id: Option<ShortString>,
        timestamp: Option<Timestamp>,
        kind: Option<ShortString>,
        user_id: Option<ShortString>,
        app_id: Option<ShortString>,
        cluster_id: Option<ShortString>,
    }

    const CONTENT_TYPE_BIT: u16 = 15;
    const CONTENT_ENCODING_BIT: u16 = 14;
    const HEADERS_BIT: u16 = 13;
    const DELIVERY_MODE_BIT: u16 = 12;
    const PRIORITY_BIT: u16 = 11;
    const CORRELATION_ID_BIT: u16 = 10;
    const REPLY_TO_BIT: u16 = 9;
    const EXPIRATION_BIT: u16 = 8;
    const MESSAGE_ID_BIT: u16 = 7;
    const TIMESTAMP_BIT: u16 = 6;
    const TYPE_BIT: u16 = 5;
    const USER_ID_BIT: u16 = 4;
    const APP_ID_BIT: u16 = 3;
    const CLUSTER_ID_BIT: u16 = 2;

    macro_rules! properties_field {
        ($with:ident, $getter:ident, $field:ident, $ty:ty) => {
            pub fn $with(mut self, value: $ty) -> Self {
                self.$field = Some(value);
                self
            }

            pub fn $getter(&self) -> &Option<$ty> {
                &self.$field
            }
        };
    }

    impl AMQPProperties {
        properties_field!(with_content_type, content_type, content_type, ShortString);
        properties_field!(with_content_encoding, content_encoding, content_encoding, ShortString);
        properties_field!(with_headers, headers, headers, FieldTable);
        properties_field!(with_delivery_mode, delivery_mode, delivery_mode, u8);
        properties_field!(with_priority, priority, priority, u8);
        properties_field!(with_correlation_id, correlation_id, correlation_id, ShortString);
        properties_field!(with_reply_to, reply_to, reply_to, ShortString);
        properties_field!(with_expiration, expiration, expiration, ShortString);
        properties_field!(with_message_id, message_id, message_id, ShortString);
        properties_field!(with_timestamp, timestamp, timestamp, Timestamp);
        properties_field!(with_kind, kind, kind, ShortString);
        properties_field!(with_user_id, user_id, user_id, ShortString);
        properties_field!(with_app_id, app_id, app_id, ShortString);
        properties_field!(with_cluster_id, cluster_id, cluster_id, ShortString);

        fn flags(&self) -> u16 {
            let mut flags = 0u16;
            let mut flag = |present: bool, bit: u16| {
                if present {
                    flags |= 1 << bit;
                }
            };
            flag(self.content_type.is_some(), CONTENT_TYPE_BIT);
            flag(self.content_encoding.is_some(), CONTENT_ENCODING_BIT);
            flag(self.headers.is_some(), HEADERS_BIT);
            flag(self.delivery_mode.is_some(), DELIVERY_MODE_BIT);
            flag(self.priority.is_some(), PRIORITY_BIT);
            flag(self.correlation_id.is_some(), CORRELATION_ID_BIT);
            flag(self.reply_to.is_some(), REPLY_TO_BIT);
            flag(self.expiration.is_some(), EXPIRATION_BIT);
            flag(self.message_id.is_some(), MESSAGE_ID_BIT);
            flag(self.timestamp.is_some(), TIMESTAMP_BIT);
            flag(self.kind.is_some(), TYPE_BIT);
            flag(self.user_id.is_some(), USER_ID_BIT);
            flag(self.app_id.is_some(), APP_ID_BIT);
            flag(self.cluster_id.is_some(), CLUSTER_ID_BIT);
            flags
        }

        pub(crate) fn encode(&self, buffer: &mut Vec<u8>) -> Result<()> {
            write_u16(buffer, self.flags());

            if let Some(v) = &self.content_type {
                write_short_string(buffer, v)?;
            }
            if let Some(v) = &self.content_encoding {
                write_short_string(buffer, v)?;
            }
            if let Some(v) = &self.headers {
                write_table(buffer, v)?;
            }
            if let Some(v) = self.delivery_mode {
                write_u8(buffer, v);
            }
            if let Some(v) = self.priority {
                write_u8(buffer, v);
            }
            if let Some(v) = &self.correlation_id {
                write_short_string(buffer, v)?;
            }
            if let Some(v) = &self.reply_to {
                write_short_string(buffer, v)?;
            }
            if let Some(v) = &self.expiration {
                write_short_string(buffer, v)?;
            }
            if let Some(v) = &self.message_id {
                write_short_string(buffer, v)?;
            }
            if let Some(v) = self.timestamp {
                write_u64(buffer, v);
            }
            if let Some(v) = &self.kind {
                write_short_string(buffer, v)?;
            }
            if let Some(v) = &self.user_id {
                write_short_string(buffer, v)?;
            }
            if let Some(v) = &self.app_id {
                write_short_string(buffer, v)?;
            }
            if let Some(v) = &self.cluster_id {
                write_short_string(buffer, v)?;
            }
            Ok(())
        }

        pub(crate) fn decode(reader: &mut ByteReader<'_>) -> Result<Self> {
            let flags = reader.read_u16()?;
            let mut properties = AMQPProperties::default();

            if flags & (1 << CONTENT_TYPE_BIT) != 0 {
                properties.content_type = Some(reader.read_short_string()?);
            }
            if flags & (1 << CONTENT_ENCODING_BIT) != 0 {
                properties.content_encoding = Some(reader.read_short_string()?);
            }
            if flags & (1 << HEADERS_BIT) != 0 {
                properties.headers = Some(reader.read_table()?);
            }
            if flags & (1 << DELIVERY_MODE_BIT) != 0 {
                properties.delivery_mode = Some(reader.read_u8()?);
            }
            if flags & (1 << PRIORITY_BIT) != 0 {
                properties.priority = Some(reader.read_u8()?);
            }
            if flags & (1 << CORRELATION_ID_BIT) != 0 {
                properties.correlation_id = Some(reader.read_short_string()?);
            }
            if flags & (1 << REPLY_TO_BIT) != 0 {
                properties.reply_to = Some(reader.read_short_string()?);
            }
            if flags & (1 << EXPIRATION_BIT) != 0 {
                properties.expiration = Some(reader.read_short_string()?);
            }
            if flags & (1 << MESSAGE_ID_BIT) != 0 {
                properties.message_id = Some(reader.read_short_string()?);
            }
            if flags & (1 << TIMESTAMP_BIT) != 0 {
                properties.timestamp = Some(reader.read_u64()?);
            }
            if flags & (1 << TYPE_BIT) != 0 {
                properties.kind = Some(reader.read_short_string()?);
            }
            if flags & (1 << USER_ID_BIT) != 0 {
                properties.user_id = Some(reader.read_short_string()?);
            }
            if flags & (1 << APP_ID_BIT) != 0 {
                properties.app_id = Some(reader.read_short_string()?);
            }
            if flags & (1 << CLUSTER_ID_BIT) != 0 {
                properties.cluster_id = Some(reader.read_short_string()?);
            }

            Ok(properties)
        }
    }
}

pub mod tx {
    #[derive(Clone, Debug, PartialEq)]
    pub enum AMQPMethod {
        Select(Select),
        SelectOk(SelectOk),
        Commit(Commit),
        CommitOk(CommitOk),
        Rollback(Rollback),
        RollbackOk(RollbackOk),
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Select {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct SelectOk {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct Commit {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct CommitOk {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct Rollback {}

    #[derive(Clone, Debug, PartialEq)]
    pub struct RollbackOk {}
}

impl AMQPClass {
    pub fn get_amqp_class_id(&self) -> ShortUInt {
        match self {
            AMQPClass::Connection(_) => CLASS_CONNECTION,
            AMQPClass::Channel(_) => CLASS_CHANNEL,
            AMQPClass::Exchange(_) => CLASS_EXCHANGE,
            AMQPClass::Queue(_) => CLASS_QUEUE,
            AMQPClass::Basic(_) => CLASS_BASIC,
            AMQPClass::Tx(_) => CLASS_TX,
        }
    }

    pub fn get_amqp_method_id(&self) -> ShortUInt {
        match self {
            AMQPClass::Connection(m) => match m {
                connection::AMQPMethod::Start(_) => CONNECTION_START,
                connection::AMQPMethod::StartOk(_) => CONNECTION_START_OK,
                connection::AMQPMethod::Secure(_) => CONNECTION_SECURE,
                connection::AMQPMethod::SecureOk(_) => CONNECTION_SECURE_OK,
                connection::AMQPMethod::Tune(_) => CONNECTION_TUNE,
                connection::AMQPMethod::TuneOk(_) => CONNECTION_TUNE_OK,
                connection::AMQPMethod::Open(_) => CONNECTION_OPEN,
                connection::AMQPMethod::OpenOk(_) => CONNECTION_OPEN_OK,
                connection::AMQPMethod::Close(_) => CONNECTION_CLOSE,
                connection::AMQPMethod::CloseOk(_) => CONNECTION_CLOSE_OK,
                connection::AMQPMethod::Blocked(_) => CONNECTION_BLOCKED,
                connection::AMQPMethod::Unblocked(_) => CONNECTION_UNBLOCKED,
            },
            AMQPClass::Channel(m) => match m {
                channel::AMQPMethod::Open(_) => CHANNEL_OPEN,
                channel::AMQPMethod::OpenOk(_) => CHANNEL_OPEN_OK,
                channel::AMQPMethod::Flow(_) => CHANNEL_FLOW,
                channel::AMQPMethod::FlowOk(_) => CHANNEL_FLOW_OK,
                channel::AMQPMethod::Close(_) => CHANNEL_CLOSE,
                channel::AMQPMethod::CloseOk(_) => CHANNEL_CLOSE_OK,
            },
            AMQPClass::Exchange(m) => match m {
                exchange::AMQPMethod::Declare(_) => EXCHANGE_DECLARE,
                exchange::AMQPMethod::DeclareOk(_) => EXCHANGE_DECLARE_OK,
                exchange::AMQPMethod::Delete(_) => EXCHANGE_DELETE,
                exchange::AMQPMethod::DeleteOk(_) => EXCHANGE_DELETE_OK,
            },
            AMQPClass::Queue(m) => match m {
                queue::AMQPMethod::Declare(_) => QUEUE_DECLARE,
                queue::AMQPMethod::DeclareOk(_) => QUEUE_DECLARE_OK,
                queue::AMQPMethod::Bind(_) => QUEUE_BIND,
                queue::AMQPMethod::BindOk(_) => QUEUE_BIND_OK,
                queue::AMQPMethod::Purge(_) => QUEUE_PURGE,
                queue::AMQPMethod::PurgeOk(_) => QUEUE_PURGE_OK,
                queue::AMQPMethod::Delete(_) => QUEUE_DELETE,
                queue::AMQPMethod::DeleteOk(_) => QUEUE_DELETE_OK,
                queue::AMQPMethod::Unbind(_) => QUEUE_UNBIND,
                queue::AMQPMethod::UnbindOk(_) => QUEUE_UNBIND_OK,
            },
            AMQPClass::Basic(m) => match m {
                basic::AMQPMethod::Qos(_) => BASIC_QOS,
                basic::AMQPMethod::QosOk(_) => BASIC_QOS_OK,
                basic::AMQPMethod::Consume(_) => BASIC_CONSUME,
                basic::AMQPMethod::ConsumeOk(_) => BASIC_CONSUME_OK,
                basic::AMQPMethod::Cancel(_) => BASIC_CANCEL,
                basic::AMQPMethod::CancelOk(_) => BASIC_CANCEL_OK,
                basic::AMQPMethod::Publish(_) => BASIC_PUBLISH,
                basic::AMQPMethod::Return(_) => BASIC_RETURN,
                basic::AMQPMethod::Deliver(_) => BASIC_DELIVER,
                basic::AMQPMethod::Get(_) => BASIC_GET,
                basic::AMQPMethod::GetOk(_) => BASIC_GET_OK,
                basic::AMQPMethod::GetEmpty(_) => BASIC_GET_EMPTY,
                basic::AMQPMethod::Ack(_) => BASIC_ACK,
                basic::AMQPMethod::Reject(_) => BASIC_REJECT,
                basic::AMQPMethod::Recover(_) => BASIC_RECOVER,
                basic::AMQPMethod::RecoverOk(_) => BASIC_RECOVER_OK,
                basic::AMQPMethod::Nack(_) => BASIC_NACK,
            },
            AMQPClass::Tx(m) => match m {
                tx::AMQPMethod::Select(_) => TX_SELECT,
                tx::AMQPMethod::SelectOk(_) => TX_SELECT_OK,
                tx::AMQPMethod::Commit(_) => TX_COMMIT,
                tx::AMQPMethod::CommitOk(_) => TX_COMMIT_OK,
                tx::AMQPMethod::Rollback(_) => TX_ROLLBACK,
                tx::AMQPMethod::RollbackOk(_) => TX_ROLLBACK_OK,
            },
        }
    }

    pub(crate) fn decode(reader: &mut ByteReader<'_>) -> Result<AMQPClass> {
        let class_id = reader.read_u16()?;
        let method_id = reader.read_u16()?;

        match (class_id, method_id) {
            (CLASS_CONNECTION, CONNECTION_START) => {
                Ok(AMQPClass::Connection(connection::AMQPMethod::Start(connection::Start {
                    version_major: reader.read_u8()?,
                    version_minor: reader.read_u8()?,
                    server_properties: reader.read_table()?,
                    mechanisms: reader.read_long_string()?,
                    locales: reader.read_long_string()?,
                })))
            }
            (CLASS_CONNECTION, CONNECTION_START_OK) => {
                Ok(AMQPClass::Connection(connection::AMQPMethod::StartOk(connection::StartOk {
                    client_properties: reader.read_table()?,
                    mechanism: reader.read_short_string()?,
                    response: reader.read_long_string()?,
                    locale: reader.read_short_string()?,
                })))
            }
            (CLASS_CONNECTION, CONNECTION_SECURE) => {
                Ok(AMQPClass::Connection(connection::AMQPMethod::Secure(connection::Secure {
                    challenge: reader.read_long_string()?,
                })))
            }
            (CLASS_CONNECTION, CONNECTION_SECURE_OK) => {
                Ok(AMQPClass::Connection(connection::AMQPMethod::SecureOk(connection::SecureOk {
                    response: reader.read_long_string()?,
                })))
            }
            (CLASS_CONNECTION, CONNECTION_TUNE) => {
                Ok(AMQPClass::Connection(connection::AMQPMethod::Tune(connection::Tune {
                    channel_max: reader.read_u16()?,
                    frame_max: reader.read_u32()?,
                    heartbeat: reader.read_u16()?,
                })))
            }
            (CLASS_CONNECTION, CONNECTION_TUNE_OK) => {
                Ok(AMQPClass::Connection(connection::AMQPMethod::TuneOk(connection::TuneOk {
                    channel_max: reader.read_u16()?,
                    frame_max: reader.read_u32()?,
                    heartbeat: reader.read_u16()?,
                })))
            }
            (CLASS_CONNECTION, CONNECTION_OPEN) => {
                let virtual_host = reader.read_short_string()?;
                let _ = reader.read_short_string()?;
                let _ = reader.read_u8()?;
                Ok(AMQPClass::Connection(connection::AMQPMethod::Open(connection::Open {
                    virtual_host,
                })))
            }
            (CLASS_CONNECTION, CONNECTION_OPEN_OK) => {
                let _ = reader.read_short_string()?;
                Ok(AMQPClass::Connection(connection::AMQPMethod::OpenOk(connection::OpenOk {})))
            }
            (CLASS_CONNECTION, CONNECTION_CLOSE) => {
                Ok(AMQPClass::Connection(connection::AMQPMethod::Close(connection::Close {
                    reply_code: reader.read_u16()?,
                    reply_text: reader.read_short_string()?,
                    class_id: reader.read_u16()?,
                    method_id: reader.read_u16()?,
                })))
            }
            (CLASS_CONNECTION, CONNECTION_CLOSE_OK) => {
                Ok(AMQPClass::Connection(connection::AMQPMethod::CloseOk(connection::CloseOk {})))
            }
            (CLASS_CONNECTION, CONNECTION_BLOCKED) => {
                Ok(AMQPClass::Connection(connection::AMQPMethod::Blocked(connection::Blocked {
                    reason: reader.read_short_string()?,
                })))
            }
            (CLASS_CONNECTION, CONNECTION_UNBLOCKED) => {
                Ok(AMQPClass::Connection(connection::AMQPMethod::Unblocked(connection::Unblocked {})))
            }
            (CLASS_CHANNEL, CHANNEL_OPEN) => {
                let _ = reader.read_short_string()?;
                Ok(AMQPClass::Channel(channel::AMQPMethod::Open(channel::Open {})))
            }
            (CLASS_CHANNEL, CHANNEL_OPEN_OK) => {
                let _ = reader.read_long_string()?;
                Ok(AMQPClass::Channel(channel::AMQPMethod::OpenOk(channel::OpenOk {})))
            }
            (CLASS_CHANNEL, CHANNEL_FLOW) => {
                Ok(AMQPClass::Channel(channel::AMQPMethod::Flow(channel::Flow {
                    active: reader.read_u8()? & 1 != 0,
                })))
            }
            (CLASS_CHANNEL, CHANNEL_FLOW_OK) => {
                Ok(AMQPClass::Channel(channel::AMQPMethod::FlowOk(channel::FlowOk {
                    active: reader.read_u8()? & 1 != 0,
                })))
            }
            (CLASS_CHANNEL, CHANNEL_CLOSE) => {
                Ok(AMQPClass::Channel(channel::AMQPMethod::Close(channel::Close {
                    reply_code: reader.read_u16()?,
                    reply_text: reader.read_short_string()?,
                    class_id: reader.read_u16()?,
                    method_id: reader.read_u16()?,
                })))
            }
            (CLASS_CHANNEL, CHANNEL_CLOSE_OK) => {
                Ok(AMQPClass::Channel(channel::AMQPMethod::CloseOk(channel::CloseOk {})))
            }
            (CLASS_EXCHANGE, EXCHANGE_DECLARE) => {
                let _ = reader.read_u16()?;
                let exchange = reader.read_short_string()?;
                let kind = reader.read_short_string()?;
                let flags = reader.read_u8()?;
                Ok(AMQPClass::Exchange(exchange::AMQPMethod::Declare(exchange::Declare {
                    exchange,
                    kind,
                    passive: flags & (1 << 0) != 0,
                    durable: flags & (1 << 1) != 0,
                    auto_delete: flags & (1 << 2) != 0,
                    internal: flags & (1 << 3) != 0,
                    nowait: flags & (1 << 4) != 0,
                    arguments: reader.read_table()?,
                })))
            }
            (CLASS_EXCHANGE, EXCHANGE_DECLARE_OK) => {
                Ok(AMQPClass::Exchange(exchange::AMQPMethod::DeclareOk(exchange::DeclareOk {})))
            }
            (CLASS_EXCHANGE, EXCHANGE_DELETE) => {
                let _ = reader.read_u16()?;
                let exchange = reader.read_short_string()?;
                let flags = reader.read_u8()?;
                Ok(AMQPClass::Exchange(exchange::AMQPMethod::Delete(exchange::Delete {
                    exchange,
                    if_unused: flags & (1 << 0) != 0,
                    nowait: flags & (1 << 1) != 0,
                })))
            }
            (CLASS_EXCHANGE, EXCHANGE_DELETE_OK) => {
                Ok(AMQPClass::Exchange(exchange::AMQPMethod::DeleteOk(exchange::DeleteOk {})))
            }
            (CLASS_QUEUE, QUEUE_DECLARE) => {
                let _ = reader.read_u16()?;
                let queue = reader.read_short_string()?;
                let flags = reader.read_u8()?;
                Ok(AMQPClass::Queue(queue::AMQPMethod::Declare(queue::Declare {
                    queue,
                    passive: flags & (1 << 0) != 0,
                    durable: flags & (1 << 1) != 0,
                    exclusive: flags & (1 << 2) != 0,
                    auto_delete: flags & (1 << 3) != 0,
                    nowait: flags & (1 << 4) != 0,
                    arguments: reader.read_table()?,
                })))
            }
            (CLASS_QUEUE, QUEUE_DECLARE_OK) => {
                Ok(AMQPClass::Queue(queue::AMQPMethod::DeclareOk(queue::DeclareOk {
                    queue: reader.read_short_string()?,
                    message_count: reader.read_u32()?,
                    consumer_count: reader.read_u32()?,
                })))
            }
            (CLASS_QUEUE, QUEUE_BIND) => {
                let _ = reader.read_u16()?;
                Ok(AMQPClass::Queue(queue::AMQPMethod::Bind(queue::Bind {
                    queue: reader.read_short_string()?,
                    exchange: reader.read_short_string()?,
                    routing_key: reader.read_short_string()?,
                    nowait: reader.read_u8()? & 1 != 0,
                    arguments: reader.read_table()?,
                })))
            }
            (CLASS_QUEUE, QUEUE_BIND_OK) => {
                Ok(AMQPClass::Queue(queue::AMQPMethod::BindOk(queue::BindOk {})))
            }
            (CLASS_QUEUE, QUEUE_PURGE) => {
                let _ = reader.read_u16()?;
                Ok(AMQPClass::Queue(queue::AMQPMethod::Purge(queue::Purge {
                    queue: reader.read_short_string()?,
                    nowait: reader.read_u8()? & 1 != 0,
                })))
            }
            (CLASS_QUEUE, QUEUE_PURGE_OK) => {
                Ok(AMQPClass::Queue(queue::AMQPMethod::PurgeOk(queue::PurgeOk {
                    message_count: reader.read_u32()?,
                })))
            }
            (CLASS_QUEUE, QUEUE_DELETE) => {
                let _ = reader.read_u16()?;
                let queue = reader.read_short_string()?;
                let flags = reader.read_u8()?;
                Ok(AMQPClass::Queue(queue::AMQPMethod::Delete(queue::Delete {
                    queue,
                    if_unused: flags & (1 << 0) != 0,
                    if_empty: flags & (1 << 1) != 0,
                    nowait: flags & (1 << 2) != 0,
                })))
            }
            (CLASS_QUEUE, QUEUE_DELETE_OK) => {
                Ok(AMQPClass::Queue(queue::AMQPMethod::DeleteOk(queue::DeleteOk {
                    message_count: reader.read_u32()?,
                })))
            }
            (CLASS_QUEUE, QUEUE_UNBIND) => {
                let _ = reader.read_u16()?;
                Ok(AMQPClass::Queue(queue::AMQPMethod::Unbind(queue::Unbind {
                    queue: reader.read_short_string()?,
                    exchange: reader.read_short_string()?,
                    routing_key: reader.read_short_string()?,
                    arguments: reader.read_table()?,
                })))
            }
            (CLASS_QUEUE, QUEUE_UNBIND_OK) => {
                Ok(AMQPClass::Queue(queue::AMQPMethod::UnbindOk(queue::UnbindOk {})))
            }
            (CLASS_BASIC, BASIC_QOS) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::Qos(basic::Qos {
                    prefetch_size: reader.read_u32()?,
                    prefetch_count: reader.read_u16()?,
                    global: reader.read_u8()? & 1 != 0,
                })))
            }
            (CLASS_BASIC, BASIC_QOS_OK) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::QosOk(basic::QosOk {})))
            }
            (CLASS_BASIC, BASIC_CONSUME) => {
                let _ = reader.read_u16()?;
                let queue = reader.read_short_string()?;
                let consumer_tag = reader.read_short_string()?;
                let flags = reader.read_u8()?;
                Ok(AMQPClass::Basic(basic::AMQPMethod::Consume(basic::Consume {
                    queue,
                    consumer_tag,
                    no_local: flags & (1 << 0) != 0,
                    no_ack: flags & (1 << 1) != 0,
                    exclusive: flags & (1 << 2) != 0,
                    nowait: flags & (1 << 3) != 0,
                    arguments: reader.read_table()?,
                })))
            }
            (CLASS_BASIC, BASIC_CONSUME_OK) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::ConsumeOk(basic::ConsumeOk {
                    consumer_tag: reader.read_short_string()?,
                })))
            }
            (CLASS_BASIC, BASIC_CANCEL) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::Cancel(basic::Cancel {
                    consumer_tag: reader.read_short_string()?,
                    nowait: reader.read_u8()? & 1 != 0,
                })))
            }
            (CLASS_BASIC, BASIC_CANCEL_OK) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::CancelOk(basic::CancelOk {
                    consumer_tag: reader.read_short_string()?,
                })))
            }
            (CLASS_BASIC, BASIC_PUBLISH) => {
                let _ = reader.read_u16()?;
                let exchange = reader.read_short_string()?;
                let routing_key = reader.read_short_string()?;
                let flags = reader.read_u8()?;
                Ok(AMQPClass::Basic(basic::AMQPMethod::Publish(basic::Publish {
                    exchange,
                    routing_key,
                    mandatory: flags & (1 << 0) != 0,
                    immediate: flags & (1 << 1) != 0,
                })))
            }
            (CLASS_BASIC, BASIC_RETURN) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::Return(basic::Return {
                    reply_code: reader.read_u16()?,
                    reply_text: reader.read_short_string()?,
                    exchange: reader.read_short_string()?,
                    routing_key: reader.read_short_string()?,
                })))
            }
            (CLASS_BASIC, BASIC_DELIVER) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::Deliver(basic::Deliver {
                    consumer_tag: reader.read_short_string()?,
                    delivery_tag: reader.read_u64()?,
                    redelivered: reader.read_u8()? & 1 != 0,
                    exchange: reader.read_short_string()?,
                    routing_key: reader.read_short_string()?,
                })))
            }
            (CLASS_BASIC, BASIC_GET) => {
                let _ = reader.read_u16()?;
                Ok(AMQPClass::Basic(basic::AMQPMethod::Get(basic::Get {
                    queue: reader.read_short_string()?,
                    no_ack: reader.read_u8()? & 1 != 0,
                })))
            }
            (CLASS_BASIC, BASIC_GET_OK) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::GetOk(basic::GetOk {
                    delivery_tag: reader.read_u64()?,
                    redelivered: reader.read_u8()? & 1 != 0,
                    exchange: reader.read_short_string()?,
                    routing_key: reader.read_short_string()?,
                    message_count: reader.read_u32()?,
                })))
            }
            (CLASS_BASIC, BASIC_GET_EMPTY) => {
                let _ = reader.read_short_string()?;
                Ok(AMQPClass::Basic(basic::AMQPMethod::GetEmpty(basic::GetEmpty {})))
            }
            (CLASS_BASIC, BASIC_ACK) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::Ack(basic::Ack {
                    delivery_tag: reader.read_u64()?,
                    multiple: reader.read_u8()? & 1 != 0,
                })))
            }
            (CLASS_BASIC, BASIC_REJECT) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::Reject(basic::Reject {
                    delivery_tag: reader.read_u64()?,
                    requeue: reader.read_u8()? & 1 != 0,
                })))
            }
            (CLASS_BASIC, BASIC_RECOVER) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::Recover(basic::Recover {
                    requeue: reader.read_u8()? & 1 != 0,
                })))
            }
            (CLASS_BASIC, BASIC_RECOVER_OK) => {
                Ok(AMQPClass::Basic(basic::AMQPMethod::RecoverOk(basic::RecoverOk {})))
            }
            (CLASS_BASIC, BASIC_NACK) => {
                let delivery_tag = reader.read_u64()?;
                let flags = reader.read_u8()?;
                Ok(AMQPClass::Basic(basic::AMQPMethod::Nack(basic::Nack {
                    delivery_tag,
                    multiple: flags & (1 << 0) != 0,
                    requeue: flags & (1 << 1) != 0,
                })))
            }
            (CLASS_TX, TX_SELECT) => Ok(AMQPClass::Tx(tx::AMQPMethod::Select(tx::Select {}))),
            (CLASS_TX, TX_SELECT_OK) => Ok(AMQPClass::Tx(tx::AMQPMethod::SelectOk(tx::SelectOk {}))),
            (CLASS_TX, TX_COMMIT) => Ok(AMQPClass::Tx(tx::AMQPMethod::Commit(tx::Commit {}))),
            (CLASS_TX, TX_COMMIT_OK) => Ok(AMQPClass::Tx(tx::AMQPMethod::CommitOk(tx::CommitOk {}))),
            (CLASS_TX, TX_ROLLBACK) => Ok(AMQPClass::Tx(tx::AMQPMethod::Rollback(tx::Rollback {}))),
            (CLASS_TX, TX_ROLLBACK_OK) => {
                Ok(AMQPClass::Tx(tx::AMQPMethod::RollbackOk(tx::RollbackOk {})))
            }
            (class_id, method_id) => Err(Error::UnknownMethod { class_id, method_id }),
        }
    }

    pub(crate) fn encode(&self, buffer: &mut Vec<u8>) -> Result<()> {
        write_u16(buffer, self.get_amqp_class_id());
        write_u16(buffer, self.get_amqp_method_id());

        match self {
            AMQPClass::Connection(m) => match m {
                connection::AMQPMethod::Start(m) => {
                    write_u8(buffer, m.version_major);
                    write_u8(buffer, m.version_minor);
                    write_table(buffer, &m.server_properties)?;
                    write_long_string(buffer, &m.mechanisms)?;
                    write_long_string(buffer, &m.locales)?;
                }
                connection::AMQPMethod::StartOk(m) => {
                    write_table(buffer, &m.client_properties)?;
                    write_short_string(buffer, &m.mechanism)?;
                    write_long_string(buffer, &m.response)?;
                    write_short_string(buffer, &m.locale)?;
                }
                connection::AMQPMethod::Secure(m) => {
                    write_long_string(buffer, &m.challenge)?;
                }
                connection::AMQPMethod::SecureOk(m) => {
                    write_long_string(buffer, &m.response)?;
                }
                connection::AMQPMethod::Tune(m) => {
                    write_u16(buffer, m.channel_max);
                    write_u32(buffer, m.frame_max);
                    write_u16(buffer, m.heartbeat);
                }
                connection::AMQPMethod::TuneOk(m) => {
                    write_u16(buffer, m.channel_max);
                    write_u32(buffer, m.frame_max);
                    write_u16(buffer, m.heartbeat);
                }
                connection::AMQPMethod::Open(m) => {
                    write_short_string(buffer, &m.virtual_host)?;
                    write_short_string(buffer, "")?;
                    write_u8(buffer, 0);
                }
                connection::AMQPMethod::OpenOk(_) => {
                    write_short_string(buffer, "")?;
                }
                connection::AMQPMethod::Close(m) => {
                    write_u16(buffer, m.reply_code);
                    write_short_string(buffer, &m.reply_text)?;
                    write_u16(buffer, m.class_id);
                    write_u16(buffer, m.method_id);
                }
                connection::AMQPMethod::CloseOk(_) => {}
                connection::AMQPMethod::Blocked(m) => {
                    write_short_string(buffer, &m.reason)?;
                }
                connection::AMQPMethod::Unblocked(_) => {}
            },
            AMQPClass::Channel(m) => match m {
                channel::AMQPMethod::Open(_) => {
                    write_short_string(buffer, "")?;
                }
                channel::AMQPMethod::OpenOk(_) => {
                    write_long_string(buffer, "")?;
                }
                channel::AMQPMethod::Flow(m) => {
                    write_u8(buffer, m.active as u8);
                }
                channel::AMQPMethod::FlowOk(m) => {
                    write_u8(buffer, m.active as u8);
                }
                channel::AMQPMethod::Close(m) => {
                    write_u16(buffer, m.reply_code);
                    write_short_string(buffer, &m.reply_text)?;
                    write_u16(buffer, m.class_id);
                    write_u16(buffer, m.method_id);
                }
                channel::AMQPMethod::CloseOk(_) => {}
            },
            AMQPClass::Exchange(m) => match m {
                exchange::AMQPMethod::Declare(m) => {
                    write_u16(buffer, 0);
                    write_short_string(buffer, &m.exchange)?;
                    write_short_string(buffer, &m.kind)?;
                    let flags = (m.passive as u8)
                        | (m.durable as u8) << 1
                        | (m.auto_delete as u8) << 2
                        | (m.internal as u8) << 3
                        | (m.nowait as u8) << 4;
                    write_u8(buffer, flags);
                    write_table(buffer, &m.arguments)?;
                }
                exchange::AMQPMethod::DeclareOk(_) => {}
                exchange::AMQPMethod::Delete(m) => {
                    write_u16(buffer, 0);
                    write_short_string(buffer, &m.exchange)?;
                    write_u8(buffer, (m.if_unused as u8) | (m.nowait as u8) << 1);
                }
                exchange::AMQPMethod::DeleteOk(_) => {}
            },
            AMQPClass::Queue(m) => match m {
                queue::AMQPMethod::Declare(m) => {
                    write_u16(buffer, 0);
                    write_short_string(buffer, &m.queue)?;
                    let flags = (m.passive as u8)
                        | (m.durable as u8) << 1
                        | (m.exclusive as u8) << 2
                        | (m.auto_delete as u8) << 3
                        | (m.nowait as u8) << 4;
                    write_u8(buffer, flags);
                    write_table(buffer, &m.arguments)?;
                }
                queue::AMQPMethod::DeclareOk(m) => {
                    write_short_string(buffer, &m.queue)?;
                    write_u32(buffer, m.message_count);
                    write_u32(buffer, m.consumer_count);
                }
                queue::AMQPMethod::Bind(m) => {
                    write_u16(buffer, 0);
                    write_short_string(buffer, &m.queue)?;
                    write_short_string(buffer, &m.exchange)?;
                    write_short_string(buffer, &m.routing_key)?;
                    write_u8(buffer, m.nowait as u8);
                    write_table(buffer, &m.arguments)?;
                }
                queue::AMQPMethod::BindOk(_) => {}
                queue::AMQPMethod::Purge(m) => {
                    write_u16(buffer, 0);
                    write_short_string(buffer, &m.queue)?;
                    write_u8(buffer, m.nowait as u8);
                }
                queue::AMQPMethod::PurgeOk(m) => {
                    write_u32(buffer, m.message_count);
                }
                queue::AMQPMethod::Delete(m) => {
                    write_u16(buffer, 0);
                    write_short_string(buffer, &m.queue)?;
                    let flags =
                        (m.if_unused as u8) | (m.if_empty as u8) << 1 | (m.nowait as u8) << 2;
                    write_u8(buffer, flags);
                }
                queue::AMQPMethod::DeleteOk(m) => {
                    write_u32(buffer, m.message_count);
                }
                queue::AMQPMethod::Unbind(m) => {
                    write_u16(buffer, 0);
                    write_short_string(buffer, &m.queue)?;
                    write_short_string(buffer, &m.exchange)?;
                    write_short_string(buffer, &m.routing_key)?;
                    write_table(buffer, &m.arguments)?;
                }
                queue::AMQPMethod::UnbindOk(_) => {}
            },
            AMQPClass::Basic(m) => match m {
                basic::AMQPMethod::Qos(m) => {
                    write_u32(buffer, m.prefetch_size);
                    write_u16(buffer, m.prefetch_count);
                    write_u8(buffer, m.global as u8);
                }
                basic::AMQPMethod::QosOk(_) => {}
                basic::AMQPMethod::Consume(m) => {
                    write_u16(buffer, 0);
                    write_short_string(buffer, &m.queue)?;
                    write_short_string(buffer, &m.consumer_tag)?;
                    let flags = (m.no_local as u8)
                        | (m.no_ack as u8) << 1
                        | (m.exclusive as u8) << 2
                        | (m.nowait as u8) << 3;
                    write_u8(buffer, flags);
                    write_table(buffer, &m.arguments)?;
                }
                basic::AMQPMethod::ConsumeOk(m) => {
                    write_short_string(buffer, &m.consumer_tag)?;
                }
                basic::AMQPMethod::Cancel(m) => {
                    write_short_string(buffer, &m.consumer_tag)?;
                    write_u8(buffer, m.nowait as u8);
                }
                basic::AMQPMethod::CancelOk(m) => {
                    write_short_string(buffer, &m.consumer_tag)?;
                }
                basic::AMQPMethod::Publish(m) => {
                    write_u16(buffer, 0);
                    write_short_string(buffer, &m.exchange)?;
                    write_short_string(buffer, &m.routing_key)?;
                    write_u8(buffer, (m.mandatory as u8) | (m.immediate as u8) << 1);
                }
                basic::AMQPMethod::Return(m) => {
                    write_u16(buffer, m.reply_code);
                    write_short_string(buffer, &m.reply_text)?;
                    write_short_string(buffer, &m.exchange)?;
                    write_short_string(buffer, &m.routing_key)?;
                }
                basic::AMQPMethod::Deliver(m) => {
                    write_short_string(buffer, &m.consumer_tag)?;
                    write_u64(buffer, m.delivery_tag);
                    write_u8(buffer, m.redelivered as u8);
                    write_short_string(buffer, &m.exchange)?;
                    write_short_string(buffer, &m.routing_key)?;
                }
                basic::AMQPMethod::Get(m) => {
                    write_u16(buffer, 0);
                    write_short_string(buffer, &m.queue)?;
                    write_u8(buffer, m.no_ack as u8);
                }
                basic::AMQPMethod::GetOk(m) => {
                    write_u64(buffer, m.delivery_tag);
                    write_u8(buffer, m.redelivered as u8);
                    write_short_string(buffer, &m.exchange)?;
                    write_short_string(buffer, &m.routing_key)?;
                    write_u32(buffer, m.message_count);
                }
                basic::AMQPMethod::GetEmpty(_) => {
                    write_short_string(buffer, "")?;
                }
                basic::AMQPMethod::Ack(m) => {
                    write_u64(buffer, m.delivery_tag);
                    write_u8(buffer, m.multiple as u8);
                }
                basic::AMQPMethod::Reject(m) => {
                    write_u64(buffer, m.delivery_tag);
                    write_u8(buffer, m.requeue as u8);
                }
                basic::AMQPMethod::Recover(m) => {
                    write_u8(buffer, m.requeue as u8);
                }
                basic::AMQPMethod::RecoverOk(_) => {}
                basic::AMQPMethod::Nack(m) => {
                    write_u64(buffer, m.delivery_tag);
                    write_u8(buffer, (m.multiple as u8) | (m.requeue as u8) << 1);
                }
            },
            AMQPClass::Tx(_) => {}
        }

        Ok(())
    }
}
