//! Frame encoding and decoding.
//!
//! Byte 0 is the message kind, byte 1 the payload length, followed by
//! `length` bytes of UTF-8 JSON. A zero length means the message has no
//! payload. There are no other boundary markers, so a frame is read in a
//! single pass without look-ahead.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{ErrorKind, Read};

use crate::packets::MessageKind;
use crate::ProtocolError;

/// Largest payload the length byte can describe.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// Reserved payload key that carries the kind of a decoded message.
pub const KIND_KEY: &str = "messageType";

/// A decoded message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Raw kind byte. Kept raw so kinds outside [`MessageKind`] still decode.
    pub kind: u8,
    /// JSON payload, always including [`KIND_KEY`].
    pub payload: Map<String, Value>,
}

impl Message {
    /// Build a message, merging the kind into the payload.
    pub fn new(kind: u8, mut payload: Map<String, Value>) -> Self {
        payload.insert(KIND_KEY.to_string(), Value::from(kind));
        Self { kind, payload }
    }

    /// The kind as a member of the closed enumeration.
    pub fn message_kind(&self) -> Result<MessageKind, ProtocolError> {
        MessageKind::try_from(self.kind)
    }
}

/// Encode a frame.
///
/// Without a payload this is exactly `[kind, 0]`. Payloads whose JSON text is
/// longer than 255 bytes are rejected, never truncated.
pub fn encode<P>(kind: MessageKind, payload: Option<&P>) -> Result<Bytes, ProtocolError>
where
    P: Serialize + ?Sized,
{
    let Some(payload) = payload else {
        let mut buf = BytesMut::with_capacity(2);
        buf.put_u8(kind as u8);
        buf.put_u8(0);
        return Ok(buf.freeze());
    };

    let text = serde_json::to_vec(payload).map_err(|source| ProtocolError::UnexpectedShape {
        kind: kind.name(),
        source,
    })?;
    if text.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge { len: text.len() });
    }

    let mut buf = BytesMut::with_capacity(2 + text.len());
    buf.put_u8(kind as u8);
    buf.put_u8(text.len() as u8);
    buf.put_slice(&text);
    Ok(buf.freeze())
}

/// Read exactly one frame from `reader`.
///
/// Blocks until the whole frame has arrived. Short reads are retried until
/// the announced length is complete; EOF or an I/O error part-way through is
/// reported as [`ProtocolError::ConnectionClosed`].
pub fn read_message<R>(reader: &mut R) -> Result<Message, ProtocolError>
where
    R: Read + ?Sized,
{
    let mut header = [0u8; 2];
    read_to_length(reader, &mut header)?;
    let [kind, len] = header;

    if len == 0 {
        return Ok(Message::new(kind, Map::new()));
    }

    let mut body = vec![0u8; len as usize];
    read_to_length(reader, &mut body)?;
    let payload: Map<String, Value> =
        serde_json::from_slice(&body).map_err(ProtocolError::MalformedPayload)?;
    Ok(Message::new(kind, payload))
}

fn read_to_length<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError>
where
    R: Read + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(ProtocolError::ConnectionClosed),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => return Err(ProtocolError::ConnectionClosed),
        }
    }
    Ok(())
}
