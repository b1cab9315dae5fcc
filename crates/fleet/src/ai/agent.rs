use protocol::{Command, Position};
use std::time::Instant;
use tracing::{debug, info};

use super::registry::Directive;
use super::state::{AgentState, BodyState, Objective, Telemetry, TurretState};
use crate::config::PolicyConfig;
use crate::geometry::{distance, heading_to, normalize_degrees, point_on_circle, to_server_heading};
use crate::world::{PickupKind, World};

/// Arena center.
const CENTER: Position = Position::ZERO;

/// Goal posts kills are banked at.
const GOALS: [Position; 2] = [Position::new(0.0, 100.0), Position::new(0.0, -100.0)];

/// Distance nudged forward each spawning tick.
const SPAWN_NUDGE: f64 = 5.0;

/// Spawning ticks between position samples.
const SPAWN_SAMPLE_TICKS: u32 = 5;

/// Minimum per-axis displacement that proves the tank can move.
const SPAWN_MOVED: f64 = 1.0;

/// The controller of one tank.
///
/// Owns its telemetry and decision state exclusively. Other workers reach it
/// only through [`Directive`]s.
#[derive(Debug)]
pub struct Agent {
    index: usize,
    name: String,
    policy: PolicyConfig,
    telemetry: Telemetry,
    state: AgentState,
}

impl Agent {
    pub fn new(index: usize, name: impl Into<String>, policy: PolicyConfig) -> Self {
        Self {
            index,
            name: name.into(),
            policy,
            telemetry: Telemetry::default(),
            state: AgentState::default(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Apply a directive posted by any worker.
    pub fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::Telemetry(telemetry) => {
                self.telemetry = telemetry;
                self.state.spawn.reported = true;
            }
            Directive::AmmoCollected => {
                self.telemetry.ammo = self.policy.max_ammo;
                self.set_body(BodyState::Circling);
                self.state.objective = None;
                info!("{} refilled ammo", self.name);
            }
            Directive::Killed => {
                self.unhook();
                self.state.kill_counter += 1;
                info!("{} scored a kill ({} unbanked)", self.name, self.state.kill_counter);
            }
            Directive::Destroyed => {
                info!("{} was destroyed", self.name);
                self.telemetry = Telemetry::default();
                self.state = AgentState::default();
            }
            Directive::EnteredGoal => {
                if self.state.kill_counter > 0 {
                    info!("{} banked {} kills", self.name, self.state.kill_counter);
                }
                self.state.kill_counter = 0;
                self.set_body(BodyState::Circling);
            }
            Directive::SeekSnitch => {
                self.set_body(BodyState::SeekingSnitch);
                self.state.turret = TurretState::EngagedSnitch;
            }
            Directive::HuntCarrier { id, position } => {
                self.set_body(BodyState::AttackingSnitchCarrier);
                self.state.objective = Some(Objective::Carrier { id, last_seen: position });
                self.state.turret = TurretState::EngagedEnemy;
            }
            Directive::Bank => {
                self.unhook();
                self.set_body(BodyState::Banking);
            }
        }
    }

    /// Run one decision step against the current world.
    ///
    /// `now` decides which enemy records are still live. `clock` is
    /// wall-clock seconds and drives the patrol phase.
    pub fn tick(&mut self, world: &World, now: Instant, clock: f64) -> Vec<Command> {
        let mut commands = Vec::new();
        self.tick_body(world, now, clock, &mut commands);
        self.tick_turret(world, now, &mut commands);
        debug!(
            "{} tick body={:?} turret={:?} -> {} commands",
            self.name,
            self.state.body,
            self.state.turret,
            commands.len()
        );
        commands
    }

    fn tick_body(&mut self, world: &World, now: Instant, clock: f64, out: &mut Vec<Command>) {
        if self.state.kill_counter > 0 {
            self.set_body(BodyState::Banking);
        }

        match self.state.body {
            BodyState::Spawning => self.spawn_step(out),
            BodyState::Circling => self.patrol(clock, out),
            BodyState::SeekingAmmo => match self.state.objective {
                Some(Objective::Pickup(pickup)) if world.has_pickup(PickupKind::Ammo, pickup) => {
                    self.move_to(pickup, 0.0, out);
                }
                _ => {
                    debug!("{} lost its ammo pickup", self.name);
                    self.state.objective = None;
                    self.set_body(BodyState::Circling);
                }
            },
            BodyState::Banking => {
                let goal = nearest_goal(self.telemetry.position);
                self.move_to(goal, 0.0, out);
            }
            BodyState::SeekingSnitch => {
                self.state.turret = TurretState::EngagedSnitch;
                match world.snitch() {
                    Some(snitch) => self.move_to(snitch, 0.0, out),
                    None => self.patrol(clock, out),
                }
            }
            BodyState::AttackingSnitchCarrier => {
                let Some(Objective::Carrier { id, .. }) = self.state.objective else {
                    self.set_body(BodyState::Circling);
                    return;
                };
                match world.enemy(id, now) {
                    Some(carrier) => {
                        let position = carrier.position;
                        self.state.objective = Some(Objective::Carrier { id, last_seen: position });
                        self.move_to(position, -self.policy.carrier_standoff, out);
                    }
                    None => {
                        info!("{} lost snitch carrier {}", self.name, id);
                        self.set_body(BodyState::Circling);
                    }
                }
            }
        }
    }

    fn tick_turret(&mut self, world: &World, now: Instant, out: &mut Vec<Command>) {
        if self.state.body == BodyState::Spawning {
            return;
        }

        if self.state.turret == TurretState::Radar {
            self.sweep(out);
            self.scan(world, now);
        }

        match self.state.turret {
            TurretState::EngagedEnemy => self.engage(world, now, out),
            TurretState::EngagedSnitch => match world.snitch() {
                Some(snitch) => self.aim_at(snitch, out),
                None => self.sweep(out),
            },
            TurretState::Radar => {}
        }
    }

    /// Nudge forward until the tank is seen moving on both axes.
    fn spawn_step(&mut self, out: &mut Vec<Command>) {
        out.push(Command::MoveForwardDistance(SPAWN_NUDGE));

        let position = self.telemetry.position;
        let spawn = &mut self.state.spawn;
        let moved = spawn.baseline.is_some_and(|base| {
            (position.x - base.x).abs() > SPAWN_MOVED && (position.y - base.y).abs() > SPAWN_MOVED
        });
        if moved {
            info!("{} is mobile at ({:.1}, {:.1})", self.name, position.x, position.y);
            self.set_body(BodyState::Circling);
            return;
        }

        if spawn.reported && (spawn.baseline.is_none() || spawn.ticks % SPAWN_SAMPLE_TICKS == 0) {
            spawn.baseline = Some(position);
        }
        spawn.ticks += 1;
    }

    /// Head back inside the outer radius, or follow the patrol circle.
    fn patrol(&self, clock: f64, out: &mut Vec<Command>) {
        let position = self.telemetry.position;
        let outer = self.policy.outer_radius;
        if (position - CENTER).length_squared() > outer * outer {
            self.move_to(CENTER, 0.0, out);
            return;
        }

        let phase = self.index as f64 * 90.0;
        let angle = normalize_degrees(clock * self.policy.patrol_speed + phase);
        let mut waypoint = point_on_circle(CENTER, self.policy.patrol_radius, angle);
        if self.index % 2 == 1 {
            waypoint.y = 2.0 * CENTER.y - waypoint.y;
        }
        self.move_to(waypoint, self.policy.patrol_overshoot, out);
    }

    /// Capture an ammo pickup or lock onto an enemy.
    fn scan(&mut self, world: &World, now: Instant) {
        let position = self.telemetry.position;
        match self.state.body {
            BodyState::Circling if self.telemetry.ammo == 0 => {
                if let Some(pickup) = world.nearest_pickup(PickupKind::Ammo, position) {
                    info!("{} going for ammo at ({:.1}, {:.1})", self.name, pickup.x, pickup.y);
                    self.state.objective = Some(Objective::Pickup(pickup));
                    self.set_body(BodyState::SeekingAmmo);
                }
            }
            BodyState::Circling => {
                let Some(id) = world.nearest_enemy(position, now) else {
                    return;
                };
                let in_range = world
                    .enemy(id, now)
                    .is_some_and(|enemy| distance(position, enemy.position) <= self.policy.engage_radius);
                if in_range {
                    debug!("{} locked onto enemy {}", self.name, id);
                    self.state.objective = Some(Objective::Enemy(id));
                    self.state.turret = TurretState::EngagedEnemy;
                }
            }
            BodyState::AttackingSnitchCarrier if self.telemetry.ammo > 0 => {
                let Some(Objective::Carrier { id, .. }) = self.state.objective else {
                    return;
                };
                let in_range = world
                    .enemy(id, now)
                    .is_some_and(|enemy| distance(position, enemy.position) <= self.policy.engage_radius);
                if in_range {
                    debug!("{} locked onto carrier {}", self.name, id);
                    self.state.turret = TurretState::EngagedEnemy;
                }
            }
            _ => {}
        }
    }

    /// Aim and fire at the hooked enemy, or drop back to radar.
    fn engage(&mut self, world: &World, now: Instant, out: &mut Vec<Command>) {
        let position = self.telemetry.position;
        let target = self
            .state
            .objective
            .and_then(|objective| objective.target_id())
            .and_then(|id| world.enemy(id, now))
            .map(|enemy| enemy.position)
            .filter(|target| distance(position, *target) <= self.policy.disengage_radius);

        match target {
            Some(target) if self.telemetry.ammo > 0 => {
                self.aim_at(target, out);
                out.push(Command::Fire);
            }
            _ => {
                debug!("{} disengaged", self.name);
                self.state.turret = TurretState::Radar;
                if matches!(self.state.objective, Some(Objective::Enemy(_))) {
                    self.state.objective = None;
                }
            }
        }
    }

    fn move_to(&self, target: Position, offset: f64, out: &mut Vec<Command>) {
        let position = self.telemetry.position;
        let heading = heading_to(position, target);
        out.push(Command::TurnToHeading(to_server_heading(heading)));
        out.push(Command::MoveForwardDistance((distance(position, target) + offset).max(0.0)));
    }

    fn aim_at(&self, target: Position, out: &mut Vec<Command>) {
        let heading = heading_to(self.telemetry.position, target);
        out.push(Command::TurnTurretToHeading(to_server_heading(heading)));
    }

    fn sweep(&self, out: &mut Vec<Command>) {
        let heading = normalize_degrees(self.telemetry.turret_heading + self.policy.radar_step);
        out.push(Command::TurnTurretToHeading(heading));
    }

    /// Drop any enemy or pickup objective and return the turret to radar.
    fn unhook(&mut self) {
        self.state.turret = TurretState::Radar;
        self.state.objective = None;
    }

    fn set_body(&mut self, next: BodyState) {
        let previous = self.state.body;
        if previous == next {
            return;
        }

        // Leaving a state drops whatever that state was hooked onto.
        match previous {
            BodyState::SeekingAmmo => {
                if matches!(self.state.objective, Some(Objective::Pickup(_))) {
                    self.state.objective = None;
                }
            }
            BodyState::AttackingSnitchCarrier => {
                if matches!(self.state.objective, Some(Objective::Carrier { .. })) {
                    self.state.objective = None;
                    if self.state.turret == TurretState::EngagedEnemy {
                        self.state.turret = TurretState::Radar;
                    }
                }
            }
            BodyState::SeekingSnitch => {
                if self.state.turret == TurretState::EngagedSnitch {
                    self.state.turret = TurretState::Radar;
                }
            }
            _ => {}
        }

        info!("{} {:?} -> {:?}", self.name, previous, next);
        self.state.body = next;
    }
}

fn nearest_goal(from: Position) -> Position {
    let mut best = GOALS[0];
    for goal in &GOALS[1..] {
        if distance(from, *goal) < distance(from, best) {
            best = *goal;
        }
    }
    best
}
