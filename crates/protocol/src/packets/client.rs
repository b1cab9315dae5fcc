//! Client -> Server command building.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use super::MessageKind;
use crate::{encode, ProtocolError};

/// An outbound command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Spawn a tank (1).
    CreateTank { name: String },
    /// Despawn this connection's tank (2).
    DespawnTank,
    /// Fire the turret (3).
    Fire,
    ToggleForward,
    ToggleReverse,
    ToggleLeft,
    ToggleRight,
    ToggleTurretLeft,
    ToggleTurretRight,
    /// Turn the turret to an absolute server heading in degrees (10).
    TurnTurretToHeading(f64),
    /// Turn the body to an absolute server heading in degrees (11).
    TurnToHeading(f64),
    /// Drive forward by a distance (12).
    MoveForwardDistance(f64),
    /// Drive backwards by a distance (13).
    MoveBackwardsDistance(f64),
    StopAll,
    StopTurn,
    StopMove,
    StopTurret,
}

#[derive(Serialize)]
struct NamePayload<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
}

#[derive(Serialize)]
struct AmountPayload {
    #[serde(rename = "Amount")]
    amount: f64,
}

impl Command {
    /// The message kind this command is sent as.
    pub fn kind(&self) -> MessageKind {
        match self {
            Command::CreateTank { .. } => MessageKind::CreateTank,
            Command::DespawnTank => MessageKind::DespawnTank,
            Command::Fire => MessageKind::Fire,
            Command::ToggleForward => MessageKind::ToggleForward,
            Command::ToggleReverse => MessageKind::ToggleReverse,
            Command::ToggleLeft => MessageKind::ToggleLeft,
            Command::ToggleRight => MessageKind::ToggleRight,
            Command::ToggleTurretLeft => MessageKind::ToggleTurretLeft,
            Command::ToggleTurretRight => MessageKind::ToggleTurretRight,
            Command::TurnTurretToHeading(_) => MessageKind::TurnTurretToHeading,
            Command::TurnToHeading(_) => MessageKind::TurnToHeading,
            Command::MoveForwardDistance(_) => MessageKind::MoveForwardDistance,
            Command::MoveBackwardsDistance(_) => MessageKind::MoveBackwardsDistance,
            Command::StopAll => MessageKind::StopAll,
            Command::StopTurn => MessageKind::StopTurn,
            Command::StopMove => MessageKind::StopMove,
            Command::StopTurret => MessageKind::StopTurret,
        }
    }

    /// Encode this command as a frame.
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let kind = self.kind();
        match self {
            Command::CreateTank { name } => encode(kind, Some(&NamePayload { name })),
            Command::TurnTurretToHeading(amount)
            | Command::TurnToHeading(amount)
            | Command::MoveForwardDistance(amount)
            | Command::MoveBackwardsDistance(amount) => {
                encode(kind, Some(&AmountPayload { amount: *amount }))
            }
            _ => encode::<Value>(kind, None),
        }
    }
}
