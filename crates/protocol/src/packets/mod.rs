//! Message definitions for the tank arena protocol.
//!
//! This module contains both outbound commands and inbound events.

mod client;
mod server;

pub use client::*;
pub use server::*;

use crate::ProtocolError;

/// Message kinds, shared by both directions.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Test = 0,
    /// Spawn a tank with a name.
    CreateTank = 1,
    DespawnTank = 2,
    Fire = 3,
    ToggleForward = 4,
    ToggleReverse = 5,
    ToggleLeft = 6,
    ToggleRight = 7,
    ToggleTurretLeft = 8,
    ToggleTurretRight = 9,
    TurnTurretToHeading = 10,
    TurnToHeading = 11,
    MoveForwardDistance = 12,
    MoveBackwardsDistance = 13,
    StopAll = 14,
    StopTurn = 15,
    StopMove = 16,
    StopTurret = 17,
    /// Position/state of a visible object.
    ObjectUpdate = 18,
    HealthPickup = 19,
    AmmoPickup = 20,
    SnitchPickup = 21,
    Destroyed = 22,
    EnteredGoal = 23,
    Kill = 24,
    SnitchAppeared = 25,
    GameTimeUpdate = 26,
    HitDetected = 27,
    SuccessfulHit = 28,
}

impl MessageKind {
    /// Every kind, ordered by code.
    pub const ALL: [MessageKind; 29] = [
        MessageKind::Test,
        MessageKind::CreateTank,
        MessageKind::DespawnTank,
        MessageKind::Fire,
        MessageKind::ToggleForward,
        MessageKind::ToggleReverse,
        MessageKind::ToggleLeft,
        MessageKind::ToggleRight,
        MessageKind::ToggleTurretLeft,
        MessageKind::ToggleTurretRight,
        MessageKind::TurnTurretToHeading,
        MessageKind::TurnToHeading,
        MessageKind::MoveForwardDistance,
        MessageKind::MoveBackwardsDistance,
        MessageKind::StopAll,
        MessageKind::StopTurn,
        MessageKind::StopMove,
        MessageKind::StopTurret,
        MessageKind::ObjectUpdate,
        MessageKind::HealthPickup,
        MessageKind::AmmoPickup,
        MessageKind::SnitchPickup,
        MessageKind::Destroyed,
        MessageKind::EnteredGoal,
        MessageKind::Kill,
        MessageKind::SnitchAppeared,
        MessageKind::GameTimeUpdate,
        MessageKind::HitDetected,
        MessageKind::SuccessfulHit,
    ];

    /// Protocol name, as used in server logs.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Test => "TEST",
            MessageKind::CreateTank => "CREATETANK",
            MessageKind::DespawnTank => "DESPAWNTANK",
            MessageKind::Fire => "FIRE",
            MessageKind::ToggleForward => "TOGGLEFORWARD",
            MessageKind::ToggleReverse => "TOGGLEREVERSE",
            MessageKind::ToggleLeft => "TOGGLELEFT",
            MessageKind::ToggleRight => "TOGGLERIGHT",
            MessageKind::ToggleTurretLeft => "TOGGLETURRETLEFT",
            MessageKind::ToggleTurretRight => "TOGGLETURRETRIGHT",
            MessageKind::TurnTurretToHeading => "TURNTURRETTOHEADING",
            MessageKind::TurnToHeading => "TURNTOHEADING",
            MessageKind::MoveForwardDistance => "MOVEFORWARDDISTANCE",
            MessageKind::MoveBackwardsDistance => "MOVEBACKWARDSDISTANCE",
            MessageKind::StopAll => "STOPALL",
            MessageKind::StopTurn => "STOPTURN",
            MessageKind::StopMove => "STOPMOVE",
            MessageKind::StopTurret => "STOPTURRET",
            MessageKind::ObjectUpdate => "OBJECTUPDATE",
            MessageKind::HealthPickup => "HEALTHPICKUP",
            MessageKind::AmmoPickup => "AMMOPICKUP",
            MessageKind::SnitchPickup => "SNITCHPICKUP",
            MessageKind::Destroyed => "DESTROYED",
            MessageKind::EnteredGoal => "ENTEREDGOAL",
            MessageKind::Kill => "KILL",
            MessageKind::SnitchAppeared => "SNITCHAPPEARED",
            MessageKind::GameTimeUpdate => "GAMETIMEUPDATE",
            MessageKind::HitDetected => "HITDETECTED",
            MessageKind::SuccessfulHit => "SUCCESSFULLHIT",
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        MessageKind::ALL
            .get(code as usize)
            .copied()
            .ok_or(ProtocolError::UnknownMessageKind(code))
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
