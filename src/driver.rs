//! The seam an I/O integration plugs into.
//!
//! The core never touches a socket. An event-loop adapter owns one, and
//! wires it up like this: transport bytes go into
//! [`Connection::handle_bytes`](crate::Connection::handle_bytes), transport
//! loss into [`Connection::handle_disconnect`](crate::Connection::handle_disconnect),
//! and whenever the connection has pending frames they are drained into a
//! [`Transport`] with [`Connection::flush`](crate::Connection::flush). A
//! [`Scheduler`] supplies the deferred and periodic callbacks the adapter
//! needs (heartbeat timers, delayed reconnects).

use std::io;
use std::time::Duration;

/// Write half of a byte-oriented, ordered, reliable transport.
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Timer facilities of the surrounding event loop.
pub trait Scheduler {
    /// Runs `callback` on the next loop turn.
    fn defer(&mut self, callback: Box<dyn FnOnce()>);

    /// Runs `callback` every `interval` until the loop shuts down.
    fn add_periodic(&mut self, interval: Duration, callback: Box<dyn FnMut()>);
}

/// In-memory transport: collects written bytes. The test double for
/// adapters and for this crate's own tests.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    written: Vec<u8>,
}

impl MemoryTransport {
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }
}

impl Transport for MemoryTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }
}
