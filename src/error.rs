use crate::channel_status::ChannelState;
use crate::connection_status::ConnectionState;
use crate::protocol::AMQPError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the protocol core.
///
/// Construction errors are returned synchronously; everything the broker or
/// the wire can throw at us is reported through callbacks or through the
/// frame-handling entry points the driver calls.
#[derive(Error, Debug)]
pub enum Error {
    #[error("channel id {id} is out of bounds (channel-max is {channel_max})")]
    ChannelOutOfBounds { id: u16, channel_max: u32 },
    #[error("channel {0} is already registered")]
    ChannelAlreadyExists(u16),
    #[error("unknown channel {0}")]
    InvalidChannel(u16),
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),
    #[error("unknown method {class_id}.{method_id}")]
    UnknownMethod { class_id: u16, method_id: u16 },
    #[error("unexpected content frame on channel {0}")]
    UnexpectedContentFrame(u16),
    #[error("unexpected reply {class_id}.{method_id}: no caller is awaiting it")]
    UnexpectedReply { class_id: u16, method_id: u16 },
    #[error("invalid channel state: {0:?}")]
    InvalidChannelState(ChannelState),
    #[error("invalid connection state: {0:?}")]
    InvalidConnectionState(ConnectionState),
    #[error("protocol error: {0}")]
    ProtocolError(AMQPError),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}
