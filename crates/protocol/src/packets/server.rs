//! Server -> Client event parsing.

use serde::Deserialize;
use serde_json::Value;

use super::MessageKind;
use crate::{Message, ObjectId, Position, ProtocolError};

/// Parsed inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A visible object's position and state (18).
    ObjectUpdate(ObjectUpdate),
    /// This tank collected a health pickup (19).
    HealthPickup,
    /// This tank collected an ammo pickup (20).
    AmmoPickup,
    /// Some tank picked up the snitch (21).
    SnitchPickup { carrier: ObjectId },
    /// This tank was destroyed and will respawn (22).
    Destroyed,
    /// This tank entered a goal (23).
    EnteredGoal,
    /// This tank killed another (24).
    Kill,
    /// The snitch appeared in the arena (25).
    SnitchAppeared,
    /// Remaining game time (26).
    GameTimeUpdate { time: Option<f64> },
    /// This tank was hit (27).
    HitDetected,
    /// This tank's shot hit something (28).
    SuccessfulHit,
    /// A known kind with no client-side meaning.
    Other(MessageKind),
    /// A kind outside the closed enumeration.
    Unknown(u8),
}

/// Payload of an OBJECTUPDATE message.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUpdate {
    pub id: ObjectId,
    pub position: Position,
    pub object: ObjectKind,
}

/// What an OBJECTUPDATE describes.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Tank(TankUpdate),
    HealthPickup,
    AmmoPickup,
    Snitch,
    /// Any `Type` this client does not track.
    Other(String),
}

/// Tank-specific OBJECTUPDATE fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TankUpdate {
    pub name: String,
    pub heading: f64,
    pub turret_heading: f64,
    pub health: u32,
    pub ammo: u32,
}

#[derive(Deserialize)]
struct RawObjectUpdate {
    #[serde(rename = "Id")]
    id: ObjectId,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "X")]
    x: f64,
    #[serde(rename = "Y")]
    y: f64,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Heading", default)]
    heading: f64,
    #[serde(rename = "TurretHeading", default)]
    turret_heading: f64,
    #[serde(rename = "Health", default)]
    health: f64,
    #[serde(rename = "Ammo", default)]
    ammo: f64,
}

#[derive(Deserialize)]
struct RawCarrier {
    #[serde(rename = "Id")]
    id: ObjectId,
}

impl Event {
    /// Classify a decoded message.
    ///
    /// Kinds outside the enumeration become [`Event::Unknown`]; well-formed
    /// JSON missing fields an event needs is reported as
    /// [`ProtocolError::UnexpectedShape`], which callers may skip.
    pub fn parse(message: &Message) -> Result<Self, ProtocolError> {
        let Ok(kind) = MessageKind::try_from(message.kind) else {
            return Ok(Event::Unknown(message.kind));
        };

        let event = match kind {
            MessageKind::ObjectUpdate => {
                let raw: RawObjectUpdate = payload_as(message, kind)?;
                Event::ObjectUpdate(raw.into())
            }
            MessageKind::HealthPickup => Event::HealthPickup,
            MessageKind::AmmoPickup => Event::AmmoPickup,
            MessageKind::SnitchPickup => {
                let raw: RawCarrier = payload_as(message, kind)?;
                Event::SnitchPickup { carrier: raw.id }
            }
            MessageKind::Destroyed => Event::Destroyed,
            MessageKind::EnteredGoal => Event::EnteredGoal,
            MessageKind::Kill => Event::Kill,
            MessageKind::SnitchAppeared => Event::SnitchAppeared,
            MessageKind::GameTimeUpdate => Event::GameTimeUpdate {
                time: message.payload.get("Time").and_then(Value::as_f64),
            },
            MessageKind::HitDetected => Event::HitDetected,
            MessageKind::SuccessfulHit => Event::SuccessfulHit,
            other => Event::Other(other),
        };
        Ok(event)
    }
}

fn payload_as<T>(message: &Message, kind: MessageKind) -> Result<T, ProtocolError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(Value::Object(message.payload.clone())).map_err(|source| {
        ProtocolError::UnexpectedShape {
            kind: kind.name(),
            source,
        }
    })
}

fn to_count(value: f64) -> u32 {
    value.max(0.0).round() as u32
}

impl From<RawObjectUpdate> for ObjectUpdate {
    fn from(raw: RawObjectUpdate) -> Self {
        let object = match raw.kind.as_str() {
            "Tank" => ObjectKind::Tank(TankUpdate {
                name: raw.name,
                heading: raw.heading,
                turret_heading: raw.turret_heading,
                health: to_count(raw.health),
                ammo: to_count(raw.ammo),
            }),
            "HealthPickup" => ObjectKind::HealthPickup,
            "AmmoPickup" => ObjectKind::AmmoPickup,
            "Snitch" => ObjectKind::Snitch,
            _ => ObjectKind::Other(raw.kind),
        };
        ObjectUpdate {
            id: raw.id,
            position: Position::new(raw.x, raw.y),
            object,
        }
    }
}
