//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while framing, parsing or sending messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("Payload too large: {len} bytes (max 255)")]
    PayloadTooLarge { len: usize },

    #[error("Unknown message kind: {0}")]
    UnknownMessageKind(u8),

    #[error("Unexpected {kind} payload: {source}")]
    UnexpectedShape {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// Whether the stream can no longer be trusted after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::ConnectionClosed | ProtocolError::MalformedPayload(_)
        )
    }
}
