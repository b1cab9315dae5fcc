//! Per-agent state owned by a single controller.

use protocol::{ObjectId, Position};

/// Ammo and health a tank respawns with.
pub const SPAWN_AMMO: u32 = 10;
pub const SPAWN_HEALTH: u32 = 3;

/// What the tank body is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyState {
    /// Nudging forward until the server lets the tank move.
    #[default]
    Spawning,
    /// Patrolling around the arena center.
    Circling,
    /// Driving to a captured ammo pickup.
    SeekingAmmo,
    /// Driving to the nearest goal to score a kill.
    Banking,
    /// Driving to the free snitch.
    SeekingSnitch,
    /// Chasing an enemy that carries the snitch.
    AttackingSnitchCarrier,
}

/// What the turret is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurretState {
    /// Sweeping and looking for targets.
    #[default]
    Radar,
    /// Locked onto an enemy, firing every tick.
    EngagedEnemy,
    /// Tracking the free snitch.
    EngagedSnitch,
}

/// Whatever the agent is currently hooked onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    Enemy(ObjectId),
    Pickup(Position),
    Carrier { id: ObjectId, last_seen: Position },
}

impl Objective {
    /// The enemy id this objective points at, if any.
    pub fn target_id(&self) -> Option<ObjectId> {
        match *self {
            Objective::Enemy(id) | Objective::Carrier { id, .. } => Some(id),
            Objective::Pickup(_) => None,
        }
    }
}

/// Last reported state of the agent's own tank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub position: Position,
    pub heading: f64,
    pub turret_heading: f64,
    pub ammo: u32,
    pub health: u32,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            position: Position::ZERO,
            heading: 0.0,
            turret_heading: 0.0,
            ammo: SPAWN_AMMO,
            health: SPAWN_HEALTH,
        }
    }
}

/// Bookkeeping for confirming the tank can move after spawning.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpawnProgress {
    /// Position sampled every few ticks.
    pub baseline: Option<Position>,
    /// Spawning ticks so far.
    pub ticks: u32,
    /// Whether any position report arrived since spawning.
    pub reported: bool,
}

/// Decision state of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgentState {
    pub body: BodyState,
    pub turret: TurretState,
    pub objective: Option<Objective>,
    /// Kills not yet banked.
    pub kill_counter: u32,
    pub spawn: SpawnProgress,
}
