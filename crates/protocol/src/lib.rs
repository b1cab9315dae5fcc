//! Shared protocol crate for tankfleet.
//!
//! This crate contains:
//! - Frame encoding/decoding (type byte, length byte, JSON payload)
//! - Message kinds, outbound commands and inbound events
//! - Shared types (Position, ObjectId)

mod error;
mod frame;
pub mod packets;

pub use error::ProtocolError;
pub use frame::{encode, read_message, Message, KIND_KEY, MAX_PAYLOAD_LEN};
pub use packets::{Command, Event, MessageKind, ObjectKind, ObjectUpdate, TankUpdate};

/// Server-assigned object id.
pub type ObjectId = i64;

/// Represents a 2D arena position using glam's DVec2.
pub type Position = glam::DVec2;
