//! The connection: owner of the channel table, driver of the opening
//! handshake and single route for every frame in either direction.
//!
//! The connection is sans-I/O. The driver feeds it transport bytes through
//! [`handle_bytes`](Connection::handle_bytes), drains outbound frames
//! through [`next_frame`](Connection::next_frame) or
//! [`flush`](Connection::flush), and reports transport loss through
//! [`handle_disconnect`](Connection::handle_disconnect).

use crate::auth::Credentials;
use crate::callbacks::{self, Callbacks, Event};
use crate::channel::Channel;
use crate::configuration::{Configuration, DEFAULT_CHANNEL_MAX};
use crate::connection_status::{ConnectingState, ConnectionState};
use crate::dispatch;
use crate::driver::Transport;
use crate::error::{Error, Result};
use crate::frame::{gen_frame, AMQPFrame, FrameDecoder};
use crate::protocol::constants::REPLY_SUCCESS;
use crate::protocol::{self, AMQPClass, AMQPError, AMQPHardError};
use crate::types::{AMQPValue, FieldTable, LongUInt, ShortUInt};

use flume::{Receiver, Sender};
use tracing::{debug, error, trace, warn};

use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Client-side handshake knobs: locale and the properties advertised in
/// `connection.start-ok`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionProperties {
    pub locale: String,
    pub client_properties: FieldTable,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            locale: "en_US".to_string(),
            client_properties: FieldTable::new(),
        }
    }
}

pub struct Connection {
    status: ConnectionState,
    configuration: Configuration,
    channels: HashMap<u16, Channel>,
    pub(crate) callbacks: Callbacks<Connection>,
    vhost: String,
    properties: ConnectionProperties,
    /// Taken out of memory once the handshake no longer needs them.
    credentials: Option<Credentials>,
    server_properties: FieldTable,
    blocked: bool,
    frame_sender: Sender<AMQPFrame>,
    frame_receiver: Receiver<AMQPFrame>,
    /// Heartbeats and close acknowledgements jump the outbound queue.
    priority_frames: VecDeque<AMQPFrame>,
    decoder: FrameDecoder,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new(ConnectionProperties::default())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("status", &self.status)
            .field("configuration", &self.configuration)
            .field("channels", &self.channels.keys())
            .field("vhost", &self.vhost)
            .field("blocked", &self.blocked)
            .finish()
    }
}

impl Connection {
    pub fn new(properties: ConnectionProperties) -> Self {
        let (frame_sender, frame_receiver) = flume::unbounded();
        Self {
            status: ConnectionState::default(),
            configuration: Configuration::default(),
            channels: HashMap::new(),
            callbacks: Callbacks::default(),
            vhost: "/".to_string(),
            properties,
            credentials: None,
            server_properties: FieldTable::new(),
            blocked: false,
            frame_sender,
            frame_receiver,
            priority_frames: VecDeque::new(),
            decoder: FrameDecoder::new(),
        }
    }

    pub fn status(&self) -> &ConnectionState {
        &self.status
    }

    pub fn is_open(&self) -> bool {
        self.status.connected()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Properties the broker advertised in `connection.start`.
    pub fn server_properties(&self) -> &FieldTable {
        &self.server_properties
    }

    pub fn set_vhost(&mut self, vhost: &str) {
        self.vhost = vhost.to_string();
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    /// Registers a standing hook on this connection.
    pub fn on(&mut self, event: Event, callback: impl FnMut(&mut Connection, &AMQPClass) + 'static) {
        self.callbacks.on(event, callback);
    }

    /// Registers a hook dropped after its first firing.
    pub fn once(&mut self, event: Event, callback: impl FnOnce(&mut Connection, &AMQPClass) + 'static) {
        self.callbacks.once(event, callback);
    }

    pub(crate) fn exec_callbacks(&mut self, event: Event, payload: &AMQPClass) {
        callbacks::emit(self, |connection| &mut connection.callbacks, event, payload);
    }

    /// Ceiling for channel ids: the negotiated maximum once the connection
    /// is open, the permissive default before that.
    pub fn channel_max(&self) -> u32 {
        let negotiated = self.configuration.channel_max();
        if !self.status.connected() || negotiated == 0 {
            DEFAULT_CHANNEL_MAX
        } else {
            negotiated as u32
        }
    }

    /// Builds a channel bound to this connection and registers it in the
    /// channel table. The channel still has to be `open`ed.
    pub fn create_channel(&mut self, id: u16) -> Result<&mut Channel> {
        let channel_max = self.channel_max();
        if id as u32 > channel_max {
            return Err(Error::ChannelOutOfBounds { id, channel_max });
        }
        if self.channels.contains_key(&id) {
            return Err(Error::ChannelAlreadyExists(id));
        }
        trace!("registering channel {}", id);
        let channel = Channel::new(id, self.configuration.clone(), self.frame_sender.clone());
        Ok(self.channels.entry(id).or_insert(channel))
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channel(&self, id: u16) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn channel_mut(&mut self, id: u16) -> Option<&mut Channel> {
        self.channels.get_mut(&id)
    }

    pub(crate) fn expect_channel(&mut self, id: u16) -> Result<&mut Channel> {
        self.channels.get_mut(&id).ok_or(Error::InvalidChannel(id))
    }

    /// Starts the opening handshake by queueing the protocol header. The
    /// rest of the handshake runs off the broker's replies.
    pub fn connect(&mut self) -> Result<()> {
        if self.status != ConnectionState::Initial {
            return Err(self.invalid_state());
        }
        self.send_frame(AMQPFrame::ProtocolHeader);
        self.status = ConnectionState::Connecting(ConnectingState::SentProtocolHeader);
        Ok(())
    }

    /// Graceful close; `callback` fires when the broker acknowledges.
    pub fn disconnect(&mut self, callback: impl FnOnce(&mut Connection, &AMQPClass) + 'static) -> Result<()> {
        if !self.status.connected() {
            return Err(Error::InvalidConnectionState(self.status.clone()));
        }
        self.callbacks.once(Event::Close, callback);
        self.status = ConnectionState::Closing;
        self.send_frame(AMQPFrame::Method(
            0,
            AMQPClass::Connection(protocol::connection::AMQPMethod::Close(protocol::connection::Close {
                reply_code: REPLY_SUCCESS,
                reply_text: "Goodbye".to_string(),
                class_id: 0,
                method_id: 0,
            })),
        ));
        Ok(())
    }

    // Outbound plumbing.

    pub fn send_frame(&mut self, frame: AMQPFrame) {
        let _ = self.frame_sender.send(frame);
    }

    /// Queues a heartbeat ahead of everything else. The driver's timer
    /// decides when to call this.
    pub fn send_heartbeat(&mut self) {
        self.priority_frames.push_front(AMQPFrame::Heartbeat(0));
    }

    /// Next frame to put on the wire, if any.
    pub fn next_frame(&mut self) -> Option<AMQPFrame> {
        self.priority_frames
            .pop_front()
            .or_else(|| self.frame_receiver.try_recv().ok())
    }

    pub fn has_pending_frames(&self) -> bool {
        !self.priority_frames.is_empty() || !self.frame_receiver.is_empty()
    }

    /// Serializes every queued frame into the transport.
    pub fn flush(&mut self, transport: &mut dyn Transport) -> Result<()> {
        while let Some(frame) = self.next_frame() {
            trace!("will write to transport: {:?}", frame);
            let mut buffer = Vec::new();
            gen_frame(&frame, &mut buffer)?;
            transport.write(&buffer)?;
        }
        Ok(())
    }

    // Inbound plumbing.

    /// Decodes and handles every complete frame in `data` (plus whatever was
    /// buffered from earlier short reads).
    pub fn handle_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.decoder.feed(data);
        loop {
            match self.decoder.next_frame() {
                Ok(Some(frame)) => self.handle_frame(frame)?,
                Ok(None) => return Ok(()),
                Err(err) => {
                    self.handle_protocol_violation(&err);
                    return Err(err);
                }
            }
        }
    }

    /// Routes one decoded frame. Framing violations close the connection
    /// with the 505 report the protocol requires before surfacing the error.
    pub fn handle_frame(&mut self, frame: AMQPFrame) -> Result<()> {
        match self.do_handle_frame(frame) {
            Err(err) if is_protocol_violation(&err) => {
                self.handle_protocol_violation(&err);
                Err(err)
            }
            other => other,
        }
    }

    fn do_handle_frame(&mut self, frame: AMQPFrame) -> Result<()> {
        trace!("will handle frame: {:?}", frame);
        match frame {
            AMQPFrame::ProtocolHeader => {
                error!("the client should not receive a protocol header");
                Err(self.invalid_state())
            }
            AMQPFrame::Method(channel_id, method) => dispatch::dispatch_method(self, channel_id, method),
            AMQPFrame::Heartbeat(0) => {
                debug!("received heartbeat from server");
                Ok(())
            }
            AMQPFrame::Heartbeat(_) => Err(Error::MalformedFrame("heartbeat on a data channel")),
            AMQPFrame::Header(0, _) | AMQPFrame::Body(0, _) => Err(Error::UnexpectedContentFrame(0)),
            AMQPFrame::Header(channel_id, header) => {
                self.expect_channel(channel_id)?.handle_content_header_frame(*header)
            }
            AMQPFrame::Body(channel_id, payload) => {
                self.expect_channel(channel_id)?.handle_body_frame(payload)
            }
        }
    }

    /// Transport loss. Indistinguishable from a broker-initiated close for
    /// everything above us: report, then cascade.
    pub fn handle_disconnect(&mut self) {
        if self.status.closed() || self.status.errored() {
            return;
        }
        error!("transport disconnected");
        self.status = ConnectionState::Error;
        let payload = AMQPClass::Connection(protocol::connection::AMQPMethod::Close(
            protocol::connection::Close {
                reply_code: AMQPHardError::CONNECTIONFORCED.get_id(),
                reply_text: "transport lost".to_string(),
                class_id: 0,
                method_id: 0,
            },
        ));
        self.exec_callbacks(Event::Error, &payload);
        self.handle_connection_interruption();
    }

    /// Resets every registered channel, then forgets them all.
    pub(crate) fn handle_connection_interruption(&mut self) {
        for channel in self.channels.values_mut() {
            channel.handle_connection_interruption();
        }
        self.channels.clear();
        self.callbacks.clear();
    }

    fn handle_protocol_violation(&mut self, err: &Error) {
        if self.status.closing() || self.status.closed() || self.status.errored() {
            return;
        }
        error!("fatal protocol violation: {}", err);
        let (class_id, method_id) = match err {
            Error::UnknownMethod { class_id, method_id }
            | Error::UnexpectedReply { class_id, method_id } => (*class_id, *method_id),
            _ => (0, 0),
        };
        let report = AMQPError::new(AMQPHardError::UNEXPECTEDFRAME.into(), err.to_string());
        self.priority_frames.push_back(AMQPFrame::Method(
            0,
            AMQPClass::Connection(protocol::connection::AMQPMethod::Close(protocol::connection::Close {
                reply_code: report.get_id(),
                reply_text: report.get_message().clone(),
                class_id,
                method_id,
            })),
        ));
        self.status = ConnectionState::Closing;
        self.handle_connection_interruption();
    }

    fn invalid_state(&mut self) -> Error {
        let state = self.status.clone();
        error!("invalid connection state: {:?}", state);
        self.status = ConnectionState::Error;
        Error::InvalidConnectionState(state)
    }

    // Connection-class method handlers, reached through the dispatcher.

    pub(crate) fn assert_channel0(&mut self, channel_id: u16, class_id: ShortUInt, method_id: ShortUInt) -> Result<()> {
        if channel_id == 0 {
            return Ok(());
        }
        error!("got a connection frame on channel {}, closing connection", channel_id);
        let report = AMQPError::new(
            AMQPHardError::COMMANDINVALID.into(),
            format!("connection frame received on channel {}", channel_id),
        );
        self.send_frame(AMQPFrame::Method(
            0,
            AMQPClass::Connection(protocol::connection::AMQPMethod::Close(protocol::connection::Close {
                reply_code: report.get_id(),
                reply_text: report.get_message().clone(),
                class_id,
                method_id,
            })),
        ));
        self.status = ConnectionState::Closing;
        self.handle_connection_interruption();
        Err(Error::ProtocolError(report))
    }

    pub(crate) fn on_unimplemented(&mut self, channel_id: u16, class_id: ShortUInt, method_id: ShortUInt) -> Result<()> {
        error!(
            "the client should not receive method {}.{} on channel {}",
            class_id, method_id, channel_id
        );
        let report = AMQPError::new(
            AMQPHardError::NOTIMPLEMENTED.into(),
            "method not handled by this client".to_string(),
        );
        self.send_frame(AMQPFrame::Method(
            0,
            AMQPClass::Connection(protocol::connection::AMQPMethod::Close(protocol::connection::Close {
                reply_code: report.get_id(),
                reply_text: report.get_message().clone(),
                class_id,
                method_id,
            })),
        ));
        self.status = ConnectionState::Closing;
        self.handle_connection_interruption();
        Err(Error::UnknownMethod { class_id, method_id })
    }

    pub(crate) fn on_connection_start(&mut self, method: protocol::connection::Start) -> Result<()> {
        trace!("server sent connection.start: {:?}", method);
        if self.status != ConnectionState::Connecting(ConnectingState::SentProtocolHeader) {
            return Err(self.invalid_state());
        }

        const MECHANISM: &str = "PLAIN";
        if !method.mechanisms.split_whitespace().any(|m| m == MECHANISM) {
            error!("unsupported mechanism: {}", MECHANISM);
        }
        if !method.locales.split_whitespace().any(|l| l == self.properties.locale) {
            error!("unsupported locale: {}", self.properties.locale);
        }
        self.server_properties = method.server_properties;

        let mut client_properties = self.properties.client_properties.clone();
        if !client_properties.contains_key("product") || !client_properties.contains_key("version") {
            client_properties.insert(
                "product".to_string(),
                AMQPValue::LongString(env!("CARGO_PKG_NAME").to_string()),
            );
            client_properties.insert(
                "version".to_string(),
                AMQPValue::LongString(env!("CARGO_PKG_VERSION").to_string()),
            );
        }
        client_properties.insert("platform".to_string(), AMQPValue::LongString("rust".to_string()));

        let mut capabilities = FieldTable::new();
        capabilities.insert("basic.nack".to_string(), AMQPValue::Boolean(true));
        capabilities.insert("consumer_cancel_notify".to_string(), AMQPValue::Boolean(true));
        capabilities.insert("connection.blocked".to_string(), AMQPValue::Boolean(true));
        capabilities.insert(
            "authentication_failure_close".to_string(),
            AMQPValue::Boolean(true),
        );
        client_properties.insert("capabilities".to_string(), AMQPValue::FieldTable(capabilities));

        let response = self
            .credentials
            .clone()
            .unwrap_or_default()
            .sasl_plain_auth_string();
        let start_ok = AMQPClass::Connection(protocol::connection::AMQPMethod::StartOk(
            protocol::connection::StartOk {
                client_properties,
                mechanism: MECHANISM.to_string(),
                response,
                locale: self.properties.locale.clone(),
            },
        ));
        debug!("client sending connection.start-ok");
        self.send_frame(AMQPFrame::Method(0, start_ok));
        self.status = ConnectionState::Connecting(ConnectingState::SentStartOk);
        Ok(())
    }

    pub(crate) fn on_connection_secure(&mut self, method: protocol::connection::Secure) -> Result<()> {
        trace!("server sent connection.secure: {:?}", method);
        if !self.status.connecting() {
            return Err(self.invalid_state());
        }
        // PLAIN has no challenge round; repeating the response satisfies
        // brokers that probe anyway.
        let response = self
            .credentials
            .clone()
            .unwrap_or_default()
            .sasl_plain_auth_string();
        self.send_frame(AMQPFrame::Method(
            0,
            AMQPClass::Connection(protocol::connection::AMQPMethod::SecureOk(
                protocol::connection::SecureOk { response },
            )),
        ));
        Ok(())
    }

    pub(crate) fn on_connection_tune(&mut self, method: protocol::connection::Tune) -> Result<()> {
        debug!("server sent connection.tune: {:?}", method);
        if self.status != ConnectionState::Connecting(ConnectingState::SentStartOk) {
            return Err(self.invalid_state());
        }

        self.tune_connection_configuration(method.channel_max, method.frame_max, method.heartbeat);
        self.decoder.set_frame_max(self.configuration.frame_max());

        let tune_ok = AMQPClass::Connection(protocol::connection::AMQPMethod::TuneOk(
            protocol::connection::TuneOk {
                channel_max: self.configuration.channel_max(),
                frame_max: self.configuration.frame_max(),
                heartbeat: self.configuration.heartbeat(),
            },
        ));
        debug!("client sending connection.tune-ok");
        self.send_frame(AMQPFrame::Method(0, tune_ok));

        let open = AMQPClass::Connection(protocol::connection::AMQPMethod::Open(
            protocol::connection::Open {
                virtual_host: self.vhost.clone(),
            },
        ));
        debug!("client sending connection.open");
        self.send_frame(AMQPFrame::Method(0, open));
        self.status = ConnectionState::Connecting(ConnectingState::SentOpen);
        Ok(())
    }

    fn tune_connection_configuration(&mut self, channel_max: ShortUInt, frame_max: LongUInt, heartbeat: ShortUInt) {
        // If we disable the heartbeat (0) but the server doesn't, follow it
        // and enable it too. When both sides want one, pick the lowest value.
        if self.configuration.heartbeat() == 0
            || (heartbeat != 0 && heartbeat < self.configuration.heartbeat())
        {
            self.configuration.set_heartbeat(heartbeat);
        }

        if channel_max != 0 {
            // 0 means we want to take the server's value
            if self.configuration.channel_max() == 0 || channel_max < self.configuration.channel_max() {
                self.configuration.set_channel_max(channel_max);
            }
        }
        if self.configuration.channel_max() == 0 {
            self.configuration.set_channel_max(u16::max_value());
        }

        if frame_max != 0 {
            // 0 means we want to take the server's value
            if self.configuration.frame_max() == 0 || frame_max < self.configuration.frame_max() {
                self.configuration.set_frame_max(frame_max);
            }
        }
        if self.configuration.frame_max() == 0 {
            self.configuration.set_frame_max(u32::max_value());
        }
    }

    pub(crate) fn on_connection_open_ok(&mut self, method: protocol::connection::OpenOk) -> Result<()> {
        if self.status != ConnectionState::Connecting(ConnectingState::SentOpen) {
            return Err(self.invalid_state());
        }
        debug!("server sent connection.open-ok, client now connected");
        self.status = ConnectionState::Connected;
        self.credentials = None;
        let payload = AMQPClass::Connection(protocol::connection::AMQPMethod::OpenOk(method));
        self.exec_callbacks(Event::Open, &payload);
        Ok(())
    }

    pub(crate) fn on_connection_close(&mut self, method: protocol::connection::Close) -> Result<()> {
        match AMQPError::from_id(method.reply_code, method.reply_text.clone()) {
            Some(err) => error!(
                "connection closed by server, {}:{} => {:?}",
                method.class_id, method.method_id, err
            ),
            None => warn!("connection closed by server: {:?}", method),
        }
        let payload = AMQPClass::Connection(protocol::connection::AMQPMethod::Close(method));
        self.exec_callbacks(Event::Error, &payload);
        self.priority_frames.push_back(AMQPFrame::Method(
            0,
            AMQPClass::Connection(protocol::connection::AMQPMethod::CloseOk(
                protocol::connection::CloseOk {},
            )),
        ));
        self.handle_connection_interruption();
        self.status = ConnectionState::Closed;
        Ok(())
    }

    pub(crate) fn on_connection_close_ok(&mut self, method: protocol::connection::CloseOk) -> Result<()> {
        debug!("server acknowledged connection.close");
        self.status = ConnectionState::Closed;
        let payload = AMQPClass::Connection(protocol::connection::AMQPMethod::CloseOk(method));
        self.exec_callbacks(Event::Close, &payload);
        self.handle_connection_interruption();
        Ok(())
    }

    pub(crate) fn on_connection_blocked(&mut self, method: protocol::connection::Blocked) -> Result<()> {
        warn!("connection blocked by server: {}", method.reason);
        self.blocked = true;
        let payload = AMQPClass::Connection(protocol::connection::AMQPMethod::Blocked(method));
        self.exec_callbacks(Event::Blocked, &payload);
        Ok(())
    }

    pub(crate) fn on_connection_unblocked(&mut self, method: protocol::connection::Unblocked) -> Result<()> {
        self.blocked = false;
        let payload = AMQPClass::Connection(protocol::connection::AMQPMethod::Unblocked(method));
        self.exec_callbacks(Event::Unblocked, &payload);
        Ok(())
    }

    pub(crate) fn on_channel_close(&mut self, channel_id: u16, method: protocol::channel::Close) -> Result<()> {
        self.expect_channel(channel_id)?.on_channel_close(method)?;
        // close-ok is already queued by the channel; now forget it
        self.channels.remove(&channel_id);
        Ok(())
    }

    pub(crate) fn on_channel_close_ok(&mut self, channel_id: u16, method: protocol::channel::CloseOk) -> Result<()> {
        self.expect_channel(channel_id)?.on_channel_close_ok(method)?;
        self.channels.remove(&channel_id);
        Ok(())
    }
}

fn is_protocol_violation(err: &Error) -> bool {
    matches!(
        err,
        Error::MalformedFrame(_)
            | Error::UnknownMethod { .. }
            | Error::UnexpectedContentFrame(_)
            | Error::UnexpectedReply { .. }
            | Error::InvalidChannel(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_status::ChannelState;
    use crate::frame::AMQPContentHeader;
    use crate::message::Delivery;
    use crate::options::*;
    use crate::protocol::basic::AMQPProperties;
    use crate::protocol::{basic, channel as channel_methods, connection, queue as queue_methods, tx};
    use crate::queue::Queue;

    use std::cell::RefCell;
    use std::rc::Rc;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn method_frame(channel_id: u16, method: AMQPClass) -> AMQPFrame {
        AMQPFrame::Method(channel_id, method)
    }

    fn start_frame() -> AMQPFrame {
        method_frame(
            0,
            AMQPClass::Connection(connection::AMQPMethod::Start(connection::Start {
                version_major: 0,
                version_minor: 9,
                server_properties: FieldTable::new(),
                mechanisms: "PLAIN AMQPLAIN".to_string(),
                locales: "en_US".to_string(),
            })),
        )
    }

    fn tune_frame() -> AMQPFrame {
        method_frame(
            0,
            AMQPClass::Connection(connection::AMQPMethod::Tune(connection::Tune {
                channel_max: 2047,
                frame_max: 131072,
                heartbeat: 60,
            })),
        )
    }

    fn open_ok_frame() -> AMQPFrame {
        method_frame(
            0,
            AMQPClass::Connection(connection::AMQPMethod::OpenOk(connection::OpenOk {})),
        )
    }

    /// Runs the whole opening handshake by feeding the broker's side of it.
    fn connected_connection() -> Connection {
        init_tracing();
        let mut conn = Connection::default();
        conn.connect().unwrap();
        conn.handle_frame(start_frame()).unwrap();
        conn.handle_frame(tune_frame()).unwrap();
        conn.handle_frame(open_ok_frame()).unwrap();
        assert!(conn.is_open());
        conn
    }

    fn drain_frames(conn: &mut Connection) -> Vec<AMQPFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = conn.next_frame() {
            frames.push(frame);
        }
        frames
    }

    fn opened_channel(conn: &mut Connection, id: u16) -> u16 {
        let channel = conn.create_channel(id).unwrap();
        channel.open(|_, _| {}).unwrap();
        conn.handle_frame(method_frame(
            id,
            AMQPClass::Channel(channel_methods::AMQPMethod::OpenOk(channel_methods::OpenOk {})),
        ))
        .unwrap();
        id
    }

    #[test]
    fn handshake_emits_the_client_side_frames() {
        let mut conn = connected_connection();
        let frames = drain_frames(&mut conn);
        assert!(matches!(frames[0], AMQPFrame::ProtocolHeader));
        assert!(matches!(
            &frames[1],
            AMQPFrame::Method(0, AMQPClass::Connection(connection::AMQPMethod::StartOk(_)))
        ));
        assert!(matches!(
            &frames[2],
            AMQPFrame::Method(0, AMQPClass::Connection(connection::AMQPMethod::TuneOk(_)))
        ));
        assert!(matches!(
            &frames[3],
            AMQPFrame::Method(0, AMQPClass::Connection(connection::AMQPMethod::Open(_)))
        ));
        assert_eq!(conn.configuration().channel_max(), 2047);
        assert_eq!(conn.configuration().frame_max(), 131072);
        assert_eq!(conn.configuration().heartbeat(), 60);
    }

    #[test]
    fn channel_open_transitions_and_fires_callback() {
        let mut conn = connected_connection();
        let states = Rc::new(RefCell::new(Vec::new()));

        let channel = conn.create_channel(1).unwrap();
        assert_eq!(channel.status(), ChannelState::Initial);
        {
            let states = states.clone();
            channel
                .open(move |channel, _| states.borrow_mut().push(channel.status()))
                .unwrap();
        }
        assert_eq!(conn.channel(1).unwrap().status(), ChannelState::Opening);

        conn.handle_frame(method_frame(
            1,
            AMQPClass::Channel(channel_methods::AMQPMethod::OpenOk(channel_methods::OpenOk {})),
        ))
        .unwrap();

        assert_eq!(conn.channel(1).unwrap().status(), ChannelState::Opened);
        assert_eq!(*states.borrow(), vec![ChannelState::Opened]);
    }

    #[test]
    fn channel_id_bounds_are_enforced() {
        let mut conn = connected_connection();
        conn.configuration().set_channel_max(16);
        match conn.create_channel(17) {
            Err(Error::ChannelOutOfBounds { id: 17, channel_max: 16 }) => {}
            other => panic!("expected out of bounds, got {:?}", other),
        }
        conn.create_channel(16).unwrap();
        assert!(matches!(conn.create_channel(16), Err(Error::ChannelAlreadyExists(16))));
    }

    #[test]
    fn channel_ids_are_unbounded_before_negotiation() {
        init_tracing();
        let mut conn = Connection::default();
        conn.create_channel(u16::max_value()).unwrap();
    }

    #[test]
    fn queue_declares_correlate_in_fifo_order() {
        let mut conn = connected_connection();
        let id = opened_channel(&mut conn, 1);
        let names = Rc::new(RefCell::new(Vec::new()));

        for _ in 0..2 {
            let names = names.clone();
            conn.channel_mut(id)
                .unwrap()
                .queue_declare(
                    Queue::new("", QueueDeclareOptions::default(), FieldTable::default()),
                    move |queue, _| names.borrow_mut().push(queue.name().to_string()),
                )
                .unwrap();
        }

        for name in ["amq.gen-1", "amq.gen-2"].iter() {
            conn.handle_frame(method_frame(
                id,
                AMQPClass::Queue(queue_methods::AMQPMethod::DeclareOk(queue_methods::DeclareOk {
                    queue: name.to_string(),
                    message_count: 0,
                    consumer_count: 0,
                })),
            ))
            .unwrap();
        }

        assert_eq!(*names.borrow(), vec!["amq.gen-1", "amq.gen-2"]);
        assert_eq!(conn.channel(id).unwrap().queue("amq.gen-1").unwrap().name(), "amq.gen-1");
        assert_eq!(conn.channel(id).unwrap().queue("amq.gen-2").unwrap().name(), "amq.gen-2");
    }

    #[test]
    fn broker_channel_close_reports_resets_and_deregisters() {
        let mut conn = connected_connection();
        let id = opened_channel(&mut conn, 1);
        let reported = Rc::new(RefCell::new(Vec::new()));

        for _ in 0..2 {
            conn.channel_mut(id)
                .unwrap()
                .queue_declare(
                    Queue::new("", QueueDeclareOptions::default(), FieldTable::default()),
                    |_, _| {},
                )
                .unwrap();
        }

        {
            let reported = reported.clone();
            conn.channel_mut(id).unwrap().on(Event::Error, move |channel, payload| {
                if let AMQPClass::Channel(channel_methods::AMQPMethod::Close(m)) = payload {
                    reported.borrow_mut().push((
                        m.reply_code,
                        m.reply_text.clone(),
                        m.class_id,
                        m.method_id,
                        channel.status(),
                        channel.awaiting.queue_declare_ok.len(),
                    ));
                }
            });
        }

        conn.handle_frame(method_frame(
            id,
            AMQPClass::Channel(channel_methods::AMQPMethod::Close(channel_methods::Close {
                reply_code: 406,
                reply_text: "PRECONDITION_FAILED".to_string(),
                class_id: 50,
                method_id: 10,
            })),
        ))
        .unwrap();

        let reported = reported.borrow();
        assert_eq!(reported.len(), 1);
        let (code, text, class_id, method_id, status, pending_at_error) = &reported[0];
        assert_eq!(*code, 406);
        assert_eq!(text, "PRECONDITION_FAILED");
        assert_eq!(*class_id, 50);
        assert_eq!(*method_id, 10);
        assert_eq!(*status, ChannelState::Closed);
        // the error callback still sees the pending declares; the reset
        // happens right after it returns
        assert_eq!(*pending_at_error, 2);
        assert!(conn.channel(id).is_none());

        // close-ok went out before the channel was dropped
        let frames = drain_frames(&mut conn);
        assert!(frames.iter().any(|frame| matches!(
            frame,
            AMQPFrame::Method(1, AMQPClass::Channel(channel_methods::AMQPMethod::CloseOk(_)))
        )));
    }

    #[test]
    fn broker_flow_updates_the_flag_and_fires_the_hook() {
        let mut conn = connected_connection();
        let id = opened_channel(&mut conn, 1);
        let seen = Rc::new(RefCell::new(Vec::new()));

        {
            let seen = seen.clone();
            conn.channel_mut(id).unwrap().on(Event::Flow, move |channel, payload| {
                if let AMQPClass::Channel(channel_methods::AMQPMethod::Flow(m)) = payload {
                    seen.borrow_mut().push((m.active, channel.flow_is_active()));
                }
            });
        }

        conn.handle_frame(method_frame(
            id,
            AMQPClass::Channel(channel_methods::AMQPMethod::Flow(channel_methods::Flow {
                active: false,
            })),
        ))
        .unwrap();

        assert!(!conn.channel(id).unwrap().flow_is_active());
        assert_eq!(*seen.borrow(), vec![(false, false)]);

        // and the client acknowledged with flow-ok
        let frames = drain_frames(&mut conn);
        assert!(frames.iter().any(|frame| matches!(
            frame,
            AMQPFrame::Method(1, AMQPClass::Channel(channel_methods::AMQPMethod::FlowOk(m))) if !m.active
        )));
    }

    #[test]
    fn transactions_confirm_in_order() {
        let mut conn = connected_connection();
        let id = opened_channel(&mut conn, 1);
        let order = Rc::new(RefCell::new(Vec::new()));

        {
            let order = order.clone();
            conn.channel_mut(id)
                .unwrap()
                .tx_select(move |_, _| order.borrow_mut().push("select"))
                .unwrap();
        }
        conn.handle_frame(method_frame(
            id,
            AMQPClass::Tx(tx::AMQPMethod::SelectOk(tx::SelectOk {})),
        ))
        .unwrap();
        {
            let order = order.clone();
            conn.channel_mut(id)
                .unwrap()
                .tx_commit(move |_, _| order.borrow_mut().push("commit"))
                .unwrap();
        }
        conn.handle_frame(method_frame(
            id,
            AMQPClass::Tx(tx::AMQPMethod::CommitOk(tx::CommitOk {})),
        ))
        .unwrap();

        assert_eq!(*order.borrow(), vec!["select", "commit"]);
    }

    #[test]
    fn delivery_is_reassembled_from_frames() {
        let mut conn = connected_connection();
        let id = opened_channel(&mut conn, 1);
        let deliveries: Rc<RefCell<Vec<Delivery>>> = Rc::new(RefCell::new(Vec::new()));

        {
            let deliveries = deliveries.clone();
            conn.channel_mut(id)
                .unwrap()
                .basic_consume(
                    "tasks",
                    "ct",
                    BasicConsumeOptions::default(),
                    FieldTable::default(),
                    move |delivery: Delivery| deliveries.borrow_mut().push(delivery),
                    |_, _| {},
                )
                .unwrap();
        }
        conn.handle_frame(method_frame(
            id,
            AMQPClass::Basic(basic::AMQPMethod::ConsumeOk(basic::ConsumeOk {
                consumer_tag: "ct".to_string(),
            })),
        ))
        .unwrap();

        conn.handle_frame(method_frame(
            id,
            AMQPClass::Basic(basic::AMQPMethod::Deliver(basic::Deliver {
                consumer_tag: "ct".to_string(),
                delivery_tag: 7,
                redelivered: false,
                exchange: "e".to_string(),
                routing_key: "rk".to_string(),
            })),
        ))
        .unwrap();
        conn.handle_frame(AMQPFrame::Header(
            id,
            Box::new(AMQPContentHeader {
                class_id: 60,
                weight: 0,
                body_size: 11,
                properties: AMQPProperties::default(),
            }),
        ))
        .unwrap();
        conn.handle_frame(AMQPFrame::Body(id, b"hello ".to_vec())).unwrap();
        conn.handle_frame(AMQPFrame::Body(id, b"world".to_vec())).unwrap();

        let deliveries = deliveries.borrow();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].data, b"hello world");
        assert_eq!(deliveries[0].delivery_tag, 7);
    }

    #[test]
    fn connection_close_from_broker_cascades_to_channels() {
        let mut conn = connected_connection();
        opened_channel(&mut conn, 1);
        opened_channel(&mut conn, 2);
        let errors = Rc::new(RefCell::new(Vec::new()));

        {
            let errors = errors.clone();
            conn.on(Event::Error, move |_, payload| {
                if let AMQPClass::Connection(connection::AMQPMethod::Close(m)) = payload {
                    errors.borrow_mut().push(m.reply_code);
                }
            });
        }

        conn.handle_frame(method_frame(
            0,
            AMQPClass::Connection(connection::AMQPMethod::Close(connection::Close {
                reply_code: 320,
                reply_text: "CONNECTION_FORCED".to_string(),
                class_id: 0,
                method_id: 0,
            })),
        ))
        .unwrap();

        assert_eq!(*errors.borrow(), vec![320]);
        assert!(conn.status().closed());
        assert!(conn.channel(1).is_none());
        assert!(conn.channel(2).is_none());

        let frames = drain_frames(&mut conn);
        assert!(frames.iter().any(|frame| matches!(
            frame,
            AMQPFrame::Method(0, AMQPClass::Connection(connection::AMQPMethod::CloseOk(_)))
        )));
    }

    #[test]
    fn transport_loss_is_a_connection_interruption() {
        let mut conn = connected_connection();
        let id = opened_channel(&mut conn, 1);
        conn.channel_mut(id)
            .unwrap()
            .queue_declare(
                Queue::new("q", QueueDeclareOptions::default(), FieldTable::default()),
                |_, _| {},
            )
            .unwrap();
        let errors = Rc::new(RefCell::new(0));

        {
            let errors = errors.clone();
            conn.on(Event::Error, move |_, _| *errors.borrow_mut() += 1);
        }

        conn.handle_disconnect();
        assert_eq!(*errors.borrow(), 1);
        assert!(conn.status().errored());
        assert!(conn.channel(id).is_none());

        // already torn down; a second disconnect is a no-op
        conn.handle_disconnect();
        assert_eq!(*errors.borrow(), 1);
    }

    #[test]
    fn graceful_disconnect_fires_close_callback() {
        let mut conn = connected_connection();
        let closed = Rc::new(RefCell::new(false));

        {
            let closed = closed.clone();
            conn.disconnect(move |_, _| *closed.borrow_mut() = true).unwrap();
        }
        assert!(conn.status().closing());

        let frames = drain_frames(&mut conn);
        match frames.last() {
            Some(AMQPFrame::Method(0, AMQPClass::Connection(connection::AMQPMethod::Close(m)))) => {
                assert_eq!(m.reply_code, 200);
                assert_eq!(m.reply_text, "Goodbye");
            }
            other => panic!("expected connection.close, got {:?}", other),
        }

        conn.handle_frame(method_frame(
            0,
            AMQPClass::Connection(connection::AMQPMethod::CloseOk(connection::CloseOk {})),
        ))
        .unwrap();
        assert!(*closed.borrow());
        assert!(conn.status().closed());
    }

    #[test]
    fn connection_frame_on_data_channel_is_fatal() {
        let mut conn = connected_connection();
        opened_channel(&mut conn, 1);

        let result = conn.handle_frame(method_frame(
            1,
            AMQPClass::Connection(connection::AMQPMethod::Blocked(connection::Blocked {
                reason: "".to_string(),
            })),
        ));
        assert!(matches!(result, Err(Error::ProtocolError(_))));
        assert!(conn.status().closing());

        let frames = drain_frames(&mut conn);
        assert!(frames.iter().any(|frame| matches!(
            frame,
            AMQPFrame::Method(0, AMQPClass::Connection(connection::AMQPMethod::Close(m))) if m.reply_code == 503
        )));
    }

    #[test]
    fn server_only_methods_are_rejected_as_unimplemented() {
        let mut conn = connected_connection();
        let id = opened_channel(&mut conn, 1);

        let result = conn.handle_frame(method_frame(
            id,
            AMQPClass::Queue(queue_methods::AMQPMethod::Declare(queue_methods::Declare {
                queue: "q".to_string(),
                passive: false,
                durable: false,
                exclusive: false,
                auto_delete: false,
                nowait: false,
                arguments: FieldTable::new(),
            })),
        ));
        assert!(matches!(result, Err(Error::UnknownMethod { .. })));

        let frames = drain_frames(&mut conn);
        assert!(frames.iter().any(|frame| matches!(
            frame,
            AMQPFrame::Method(0, AMQPClass::Connection(connection::AMQPMethod::Close(m))) if m.reply_code == 540
        )));
    }

    #[test]
    fn blocked_and_unblocked_toggle_the_flag() {
        let mut conn = connected_connection();
        conn.handle_frame(method_frame(
            0,
            AMQPClass::Connection(connection::AMQPMethod::Blocked(connection::Blocked {
                reason: "resource alarm".to_string(),
            })),
        ))
        .unwrap();
        assert!(conn.is_blocked());

        conn.handle_frame(method_frame(
            0,
            AMQPClass::Connection(connection::AMQPMethod::Unblocked(connection::Unblocked {})),
        ))
        .unwrap();
        assert!(!conn.is_blocked());
    }

    #[test]
    fn heartbeat_goes_ahead_of_queued_frames() {
        let mut conn = connected_connection();
        drain_frames(&mut conn);
        conn.send_frame(AMQPFrame::Body(1, vec![1, 2, 3]));
        conn.send_heartbeat();

        let frames = drain_frames(&mut conn);
        assert!(matches!(frames[0], AMQPFrame::Heartbeat(0)));
        assert!(matches!(frames[1], AMQPFrame::Body(1, _)));
    }

    #[test]
    fn bytes_roundtrip_through_the_public_surface() {
        use crate::driver::MemoryTransport;

        init_tracing();
        let mut conn = Connection::default();
        conn.connect().unwrap();

        let mut broker_bytes = Vec::new();
        for frame in [start_frame(), tune_frame(), open_ok_frame()].iter() {
            gen_frame(frame, &mut broker_bytes).unwrap();
        }
        // feed in two arbitrary slices to exercise the short-read path
        let (left, right) = broker_bytes.split_at(13);
        conn.handle_bytes(left).unwrap();
        conn.handle_bytes(right).unwrap();
        assert!(conn.is_open());

        let mut transport = MemoryTransport::default();
        conn.flush(&mut transport).unwrap();
        assert!(transport.written().starts_with(b"AMQP\x00\x00\x09\x01"));
    }
}
