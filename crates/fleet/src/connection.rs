//! One agent's connection to the game server.

use protocol::{encode, read_message, Command, Message, MessageKind, ProtocolError};
use serde::Serialize;
use std::io::{Read, Write};
use std::net::TcpStream;
use tracing::{trace, warn};

use crate::FleetError;

/// A framed, blocking connection.
///
/// Reads and writes are issued by the owning worker only, so each direction
/// has at most one operation in flight.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    stream: S,
}

impl Connection<TcpStream> {
    /// Open a TCP connection to the game server.
    pub fn connect(host: &str, port: u16) -> Result<Self, FleetError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr).map_err(|source| FleetError::Connect {
            addr: addr.clone(),
            source,
        })?;
        // Commands are tiny and latency matters more than throughput.
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to disable Nagle on {}: {}", addr, e);
        }
        Ok(Self::from_stream(stream))
    }
}

impl<S: Read + Write> Connection<S> {
    /// Wrap an already connected byte stream.
    pub fn from_stream(stream: S) -> Self {
        Self { stream }
    }

    /// Send a command. Nothing is written if the command fails to encode.
    pub fn send(&mut self, command: &Command) -> Result<(), ProtocolError> {
        let frame = command.encode()?;
        trace!("Sending {:?} as {}", command, hex(&frame));
        self.write_frame(&frame)
    }

    /// Send an arbitrary message.
    pub fn send_message<P>(&mut self, kind: MessageKind, payload: Option<&P>) -> Result<(), ProtocolError>
    where
        P: Serialize + ?Sized,
    {
        let frame = encode(kind, payload)?;
        trace!("Sending {} as {}", kind, hex(&frame));
        self.write_frame(&frame)
    }

    /// Block until the next complete message arrives.
    pub fn receive(&mut self) -> Result<Message, ProtocolError> {
        let message = read_message(&mut self.stream)?;
        trace!("Received kind {} payload {:?}", message.kind, message.payload);
        Ok(message)
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), ProtocolError> {
        self.stream
            .write_all(frame)
            .and_then(|_| self.stream.flush())
            .map_err(|_| ProtocolError::ConnectionClosed)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
