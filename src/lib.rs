//! coney
//!
//! The core of an AMQP 0.9.1 client: channel multiplexing, the protocol
//! state machines for connections, channels, queues, exchanges and
//! consumers, and a bit-exact frame codec.
//!
//! The crate is sans-I/O. It assumes a byte-oriented, ordered, reliable
//! transport owned by an injected event-loop driver: the driver feeds
//! received bytes into [`Connection::handle_bytes`], drains outbound frames
//! with [`Connection::flush`] (or [`Connection::next_frame`]) and reports
//! transport loss through [`Connection::handle_disconnect`]. Every
//! operation returns once its frame is queued; completion is observable
//! only through the registered callback.
//!
//! ## Example
//!
//! ```rust
//! use coney::{Connection, Credentials, MemoryTransport};
//!
//! let mut conn = Connection::default();
//! conn.set_credentials(Credentials::new("guest".to_string(), "guest".to_string()));
//! conn.connect().expect("connect");
//!
//! // the handshake starts with the protocol header; hand it to the transport
//! let mut transport = MemoryTransport::default();
//! conn.flush(&mut transport).expect("flush");
//! assert!(transport.written().starts_with(b"AMQP\x00\x00\x09\x01"));
//! ```

mod auth;
mod buffer;
mod callbacks;
mod channel;
mod channel_status;
mod configuration;
mod connection;
mod connection_status;
mod consumer;
mod dispatch;
mod error;
mod exchange;
mod frame;
mod message;
mod options;
mod queue;

pub mod driver;
pub mod protocol;
pub mod types;

pub use crate::auth::Credentials;
pub use crate::callbacks::{Callbacks, Event};
pub use crate::channel::{Channel, GetCallback};
pub use crate::channel_status::ChannelState;
pub use crate::configuration::{Configuration, DEFAULT_CHANNEL_MAX};
pub use crate::connection::{Connection, ConnectionProperties};
pub use crate::connection_status::{ConnectingState, ConnectionState};
pub use crate::consumer::{Consumer, ConsumerDelegate};
pub use crate::driver::{MemoryTransport, Scheduler, Transport};
pub use crate::error::{Error, Result};
pub use crate::exchange::{Exchange, ExchangeKind};
pub use crate::frame::{gen_frame, AMQPContentHeader, AMQPFrame, FrameDecoder};
pub use crate::message::{BasicGetMessage, BasicReturnMessage, Delivery};
pub use crate::options::*;
pub use crate::queue::Queue;

/// Content header properties of the basic class.
pub type BasicProperties = protocol::basic::AMQPProperties;
