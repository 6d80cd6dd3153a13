//! Frame-level codec: the envelope around method, content header, content
//! body and heartbeat payloads.
//!
//! On the wire every frame is `type (1) | channel (2) | size (4) | payload |
//! 0xCE`. The protocol header that opens a connection is the one exception:
//! eight raw bytes, no envelope.

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::protocol::basic::AMQPProperties;
use crate::protocol::constants::*;
use crate::protocol::AMQPClass;
use crate::types::*;

use tracing::trace;

/// A single decoded frame, tagged with the channel it travels on.
#[derive(Clone, Debug, PartialEq)]
pub enum AMQPFrame {
    ProtocolHeader,
    Method(u16, AMQPClass),
    Header(u16, Box<AMQPContentHeader>),
    Body(u16, Vec<u8>),
    Heartbeat(u16),
}

impl AMQPFrame {
    pub fn channel_id(&self) -> u16 {
        match self {
            AMQPFrame::ProtocolHeader => 0,
            AMQPFrame::Method(channel_id, _) => *channel_id,
            AMQPFrame::Header(channel_id, _) => *channel_id,
            AMQPFrame::Body(channel_id, _) => *channel_id,
            AMQPFrame::Heartbeat(channel_id) => *channel_id,
        }
    }
}

/// The payload of a content header frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AMQPContentHeader {
    pub class_id: ShortUInt,
    pub weight: ShortUInt,
    pub body_size: LongLongUInt,
    pub properties: AMQPProperties,
}

/// Serializes a frame into `buffer`.
pub fn gen_frame(frame: &AMQPFrame, buffer: &mut Vec<u8>) -> Result<()> {
    match frame {
        AMQPFrame::ProtocolHeader => {
            write_bytes(buffer, PROTOCOL_HEADER);
            return Ok(());
        }
        AMQPFrame::Method(channel_id, method) => {
            let mut payload = Vec::new();
            method.encode(&mut payload)?;
            write_envelope(buffer, FRAME_METHOD, *channel_id, &payload);
        }
        AMQPFrame::Header(channel_id, header) => {
            let mut payload = Vec::new();
            write_u16(&mut payload, header.class_id);
            write_u16(&mut payload, header.weight);
            write_u64(&mut payload, header.body_size);
            header.properties.encode(&mut payload)?;
            write_envelope(buffer, FRAME_HEADER, *channel_id, &payload);
        }
        AMQPFrame::Body(channel_id, payload) => {
            write_envelope(buffer, FRAME_BODY, *channel_id, payload);
        }
        AMQPFrame::Heartbeat(channel_id) => {
            write_envelope(buffer, FRAME_HEARTBEAT, *channel_id, &[]);
        }
    }
    Ok(())
}

fn write_envelope(buffer: &mut Vec<u8>, frame_type: u8, channel_id: u16, payload: &[u8]) {
    write_u8(buffer, frame_type);
    write_u16(buffer, channel_id);
    write_u32(buffer, payload.len() as u32);
    write_bytes(buffer, payload);
    write_u8(buffer, FRAME_END);
}

const ENVELOPE_HEADER_SIZE: usize = 7;

/// Incremental frame decoder.
///
/// Feed it transport bytes as they arrive and drain decoded frames with
/// [`next_frame`](FrameDecoder::next_frame). A partial frame stays buffered
/// until the rest of it shows up; that is not an error.
pub struct FrameDecoder {
    buffer: Buffer,
    frame_max: LongUInt,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> FrameDecoder {
        FrameDecoder {
            buffer: Buffer::new(),
            frame_max: 0,
        }
    }

    /// Bounds accepted payload sizes; 0 means not negotiated yet.
    pub fn set_frame_max(&mut self, frame_max: LongUInt) {
        self.frame_max = frame_max;
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Decodes the next buffered frame, or `None` on a short read.
    pub fn next_frame(&mut self) -> Result<Option<AMQPFrame>> {
        if self.buffer.available_data() < ENVELOPE_HEADER_SIZE {
            return Ok(None);
        }

        let (frame_type, channel_id, payload_size) = {
            let mut reader = ByteReader::new(self.buffer.data());
            (reader.read_u8()?, reader.read_u16()?, reader.read_u32()? as usize)
        };

        if self.frame_max != 0 && payload_size > self.frame_max as usize {
            return Err(Error::MalformedFrame("payload exceeds frame-max"));
        }

        let total_size = ENVELOPE_HEADER_SIZE + payload_size + 1;
        if self.buffer.available_data() < total_size {
            return Ok(None);
        }

        let frame = {
            let data = self.buffer.data();
            if data[total_size - 1] != FRAME_END {
                return Err(Error::MalformedFrame("bad frame-end sentinel"));
            }
            let payload = &data[ENVELOPE_HEADER_SIZE..ENVELOPE_HEADER_SIZE + payload_size];
            decode_payload(frame_type, channel_id, payload)?
        };

        self.buffer.consume(total_size);
        trace!(channel = channel_id, "decoded frame: {:?}", frame);
        Ok(Some(frame))
    }
}

fn decode_payload(frame_type: u8, channel_id: u16, payload: &[u8]) -> Result<AMQPFrame> {
    match frame_type {
        FRAME_METHOD => {
            let mut reader = ByteReader::new(payload);
            Ok(AMQPFrame::Method(channel_id, AMQPClass::decode(&mut reader)?))
        }
        FRAME_HEADER => {
            let mut reader = ByteReader::new(payload);
            let class_id = reader.read_u16()?;
            let weight = reader.read_u16()?;
            let body_size = reader.read_u64()?;
            let properties = AMQPProperties::decode(&mut reader)?;
            Ok(AMQPFrame::Header(
                channel_id,
                Box::new(AMQPContentHeader {
                    class_id,
                    weight,
                    body_size,
                    properties,
                }),
            ))
        }
        FRAME_BODY => Ok(AMQPFrame::Body(channel_id, payload.to_vec())),
        FRAME_HEARTBEAT => Ok(AMQPFrame::Heartbeat(channel_id)),
        _ => Err(Error::MalformedFrame("unknown frame type")),
    }
}
