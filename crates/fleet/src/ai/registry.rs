//! Per-agent inboxes.
//!
//! Agents never touch each other's state. Anything one worker learns that
//! concerns another agent is posted here and applied by the owner on its
//! next tick.

use protocol::{ObjectId, Position};
use std::sync::mpsc;
use tracing::warn;

use super::state::Telemetry;

/// A state change requested for one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Directive {
    /// Fresh report of the agent's own tank.
    Telemetry(Telemetry),
    /// The agent drove over an ammo pickup.
    AmmoCollected,
    /// The agent killed an enemy.
    Killed,
    /// The agent's tank was destroyed.
    Destroyed,
    /// The agent reached a goal.
    EnteredGoal,
    /// Go after the free snitch.
    SeekSnitch,
    /// Go after an enemy carrying the snitch.
    HuntCarrier { id: ObjectId, position: Position },
    /// The agent carries the snitch; take it to a goal.
    Bank,
}

/// Receiving end of an agent's inbox.
pub type Inbox = mpsc::Receiver<Directive>;

/// Sending ends of every agent's inbox, indexed by agent.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    inboxes: Vec<mpsc::Sender<Directive>>,
}

impl AgentRegistry {
    /// Create inboxes for `size` agents.
    pub fn new(size: usize) -> (Self, Vec<Inbox>) {
        let (senders, receivers) = (0..size).map(|_| mpsc::channel()).unzip();
        (Self { inboxes: senders }, receivers)
    }

    pub fn len(&self) -> usize {
        self.inboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty()
    }

    /// Post a directive. Returns false if the agent is unknown or stopped.
    pub fn send(&self, index: usize, directive: Directive) -> bool {
        let Some(inbox) = self.inboxes.get(index) else {
            warn!("No agent {} for {:?}", index, directive);
            return false;
        };
        inbox.send(directive).is_ok()
    }
}
