//! Routes inbound events into the world store and agent inboxes.

use protocol::{Event, ObjectId, ObjectKind, ObjectUpdate, TankUpdate};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use super::registry::{AgentRegistry, Directive};
use super::state::{Telemetry, SPAWN_HEALTH};
use crate::config::PolicyConfig;
use crate::geometry::distance;
use crate::world::{PickupKind, SharedWorld};

/// Agents sent after the snitch or its carrier.
const SNITCH_SQUAD: usize = 2;

/// Applies events received by any agent's connection.
///
/// Cloned into every worker; all clones share the same world and registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    team_name: String,
    team_size: usize,
    pickup_radius: f64,
    world: SharedWorld,
    registry: AgentRegistry,
}

impl Dispatcher {
    pub fn new(team_name: impl Into<String>, policy: &PolicyConfig, world: SharedWorld, registry: AgentRegistry) -> Self {
        Self {
            team_name: team_name.into(),
            team_size: registry.len(),
            pickup_radius: policy.pickup_radius,
            world,
            registry,
        }
    }

    /// Handle one event received on agent `origin`'s connection.
    pub fn dispatch(&self, origin: usize, event: &Event, now: Instant) {
        match event {
            Event::ObjectUpdate(update) => self.object_update(update, now),
            Event::AmmoPickup => self.pickup_collected(origin, PickupKind::Ammo),
            Event::HealthPickup => self.pickup_collected(origin, PickupKind::Health),
            Event::Kill => {
                self.world.lock().clear_enemies();
                self.registry.send(origin, Directive::Killed);
            }
            Event::Destroyed => {
                self.registry.send(origin, Directive::Destroyed);
            }
            Event::EnteredGoal => {
                self.registry.send(origin, Directive::EnteredGoal);
            }
            Event::SnitchPickup { carrier } => self.snitch_picked_up(*carrier, now),
            Event::SnitchAppeared => self.snitch_appeared(),
            Event::HitDetected => debug!("Agent {} was hit", origin),
            Event::SuccessfulHit => debug!("Agent {} landed a hit", origin),
            Event::GameTimeUpdate { time } => trace!("Game time {:?}", time),
            Event::Other(kind) => debug!("Ignoring {} on agent {}", kind, origin),
            Event::Unknown(code) => debug!("Ignoring unknown message kind {} on agent {}", code, origin),
        }
    }

    fn object_update(&self, update: &ObjectUpdate, now: Instant) {
        match &update.object {
            ObjectKind::Tank(tank) => match self.own_tank_name(&tank.name) {
                Some(Ok(index)) => self.own_tank(index, update, tank),
                Some(Err(suffix)) => {
                    warn!("Tank {:?} has our team prefix but no agent {:?}", tank.name, suffix);
                }
                None => {
                    self.world.lock().upsert_enemy(update.id, update.position, tank.health, now);
                }
            },
            ObjectKind::AmmoPickup => self.world.lock().add_ammo_pickup(update.position, now),
            ObjectKind::HealthPickup => self.world.lock().add_health_pickup(update.position, now),
            ObjectKind::Snitch => self.world.lock().set_snitch(Some(update.position)),
            ObjectKind::Other(kind) => trace!("Ignoring object {} of type {}", update.id, kind),
        }
    }

    fn own_tank(&self, index: usize, update: &ObjectUpdate, tank: &TankUpdate) {
        self.world.lock().record_teammate(index, update.id, update.position, tank.health);
        self.registry.send(
            index,
            Directive::Telemetry(Telemetry {
                position: update.position,
                heading: tank.heading,
                turret_heading: tank.turret_heading,
                ammo: tank.ammo,
                health: tank.health,
            }),
        );
    }

    /// Classify a tank name against the `<team>:<index>` names our tanks are
    /// spawned with.
    ///
    /// `None` for any other team. `Some(Err(suffix))` when the prefix is ours
    /// but the suffix is not a single digit below the team size.
    fn own_tank_name<'a>(&self, name: &'a str) -> Option<Result<usize, &'a str>> {
        let suffix = name.strip_prefix(self.team_name.as_str())?.strip_prefix(':')?;
        let mut chars = suffix.chars();
        let index = match (chars.next().and_then(|c| c.to_digit(10)), chars.next()) {
            (Some(digit), None) => digit as usize,
            _ => return Some(Err(suffix)),
        };
        Some(if index < self.team_size { Ok(index) } else { Err(suffix) })
    }

    fn pickup_collected(&self, origin: usize, kind: PickupKind) {
        {
            let mut world = self.world.lock();
            let at = world.teammate(origin).map(|t| t.position);
            match at {
                Some(at) => {
                    let removed = world.remove_pickup_near(kind, at, self.pickup_radius);
                    debug!("Agent {} collected {:?}, dropped {} records", origin, kind, removed);
                }
                None => debug!("Agent {} collected {:?} before reporting a position", origin, kind),
            }
        }
        if kind == PickupKind::Ammo {
            self.registry.send(origin, Directive::AmmoCollected);
        }
    }

    fn snitch_picked_up(&self, carrier: ObjectId, now: Instant) {
        let directives: Vec<(usize, Directive)> = {
            let mut world = self.world.lock();
            world.set_snitch(None);

            if let Some(enemy) = world.enemy(carrier, now).copied() {
                let mut hunters: Vec<(usize, f64)> = world
                    .teammates()
                    .map(|t| (t.index, distance(t.position, enemy.position)))
                    .collect();
                hunters.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
                info!("Enemy {} has the snitch", carrier);
                hunters
                    .into_iter()
                    .take(SNITCH_SQUAD)
                    .map(|(index, _)| {
                        let hunt = Directive::HuntCarrier {
                            id: carrier,
                            position: enemy.position,
                        };
                        (index, hunt)
                    })
                    .collect()
            } else if let Some(index) = world.map_object_to_agent(carrier) {
                info!("Agent {} has the snitch", index);
                vec![(index, Directive::Bank)]
            } else {
                debug!("Snitch picked up by unknown object {}", carrier);
                Vec::new()
            }
        };

        for (index, directive) in directives {
            self.registry.send(index, directive);
        }
    }

    fn snitch_appeared(&self) {
        let mut seekers: Vec<(usize, u32)> = {
            let world = self.world.lock();
            (0..self.team_size)
                .map(|index| {
                    let health = world.teammate(index).map_or(SPAWN_HEALTH, |t| t.health);
                    (index, health)
                })
                .collect()
        };
        seekers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        info!("Snitch appeared");
        for (index, _) in seekers.into_iter().take(SNITCH_SQUAD) {
            self.registry.send(index, Directive::SeekSnitch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::registry::Inbox;
    use crate::world::World;
    use protocol::Position;
    use std::time::Duration;

    fn setup(size: usize) -> (Dispatcher, SharedWorld, Vec<Inbox>) {
        let world = SharedWorld::new(World::with_windows(Duration::from_secs(3), Duration::from_secs(15)));
        let (registry, inboxes) = AgentRegistry::new(size);
        let dispatcher = Dispatcher::new("fleet", &PolicyConfig::default(), world.clone(), registry);
        (dispatcher, world, inboxes)
    }

    fn tank(id: ObjectId, name: &str, x: f64, y: f64, health: u32) -> Event {
        Event::ObjectUpdate(ObjectUpdate {
            id,
            position: Position::new(x, y),
            object: ObjectKind::Tank(TankUpdate {
                name: name.to_string(),
                heading: 90.0,
                turret_heading: 45.0,
                health,
                ammo: 7,
            }),
        })
    }

    fn object(id: ObjectId, object: ObjectKind, x: f64, y: f64) -> Event {
        Event::ObjectUpdate(ObjectUpdate {
            id,
            position: Position::new(x, y),
            object,
        })
    }

    fn drain(inbox: &Inbox) -> Vec<Directive> {
        inbox.try_iter().collect()
    }

    #[test]
    fn test_own_tank_update_becomes_telemetry() {
        let (dispatcher, world, inboxes) = setup(4);
        dispatcher.dispatch(0, &tank(42, "fleet:2", 3.0, 4.0, 2), Instant::now());

        let got = drain(&inboxes[2]);
        assert_eq!(
            got,
            vec![Directive::Telemetry(Telemetry {
                position: Position::new(3.0, 4.0),
                heading: 90.0,
                turret_heading: 45.0,
                ammo: 7,
                health: 2,
            })]
        );
        assert!(drain(&inboxes[0]).is_empty());

        let world = world.lock();
        assert_eq!(world.map_object_to_agent(42), Some(2));
        assert_eq!(world.teammate(2).unwrap().health, 2);
        assert_eq!(world.enemy_count(), 0);
    }

    #[test]
    fn test_own_tank_with_bad_index_is_ignored() {
        let (dispatcher, world, inboxes) = setup(2);
        dispatcher.dispatch(0, &tank(1, "fleet:7", 0.0, 0.0, 3), Instant::now());
        dispatcher.dispatch(0, &tank(2, "fleet:x", 0.0, 0.0, 3), Instant::now());

        assert!(inboxes.iter().all(|inbox| drain(inbox).is_empty()));
        let world = world.lock();
        assert_eq!(world.enemy_count(), 0);
        assert_eq!(world.teammates().count(), 0);
    }

    #[test]
    fn test_rivals_sharing_our_prefix_are_enemies() {
        let (dispatcher, world, inboxes) = setup(4);
        let now = Instant::now();
        dispatcher.dispatch(0, &tank(500, "fleetB:1", 10.0, 0.0, 3), now);
        dispatcher.dispatch(0, &tank(501, "fleet-rivals", -10.0, 0.0, 3), now);
        dispatcher.dispatch(0, &tank(502, "fleet:12", 0.0, 10.0, 3), now);

        assert!(inboxes.iter().all(|inbox| drain(inbox).is_empty()));
        let world = world.lock();
        assert!(world.enemy(500, now).is_some());
        assert!(world.enemy(501, now).is_some());
        assert!(world.enemy(502, now).is_none());
        assert_eq!(world.map_object_to_agent(500), None);
        assert_eq!(world.teammates().count(), 0);
    }

    #[test]
    fn test_enemy_tank_update() {
        let (dispatcher, world, _inboxes) = setup(2);
        dispatcher.dispatch(1, &tank(9, "rivals:0", 10.0, 0.0, 3), Instant::now());
        assert!(world.lock().enemy(9, Instant::now()).is_some());

        dispatcher.dispatch(1, &tank(9, "rivals:0", 10.0, 0.0, 0), Instant::now());
        assert!(world.lock().enemy(9, Instant::now()).is_none());
    }

    #[test]
    fn test_pickups_and_snitch_are_recorded() {
        let (dispatcher, world, _inboxes) = setup(1);
        let now = Instant::now();
        dispatcher.dispatch(0, &object(1, ObjectKind::AmmoPickup, 5.0, 5.0), now);
        dispatcher.dispatch(0, &object(2, ObjectKind::HealthPickup, -5.0, 5.0), now);
        dispatcher.dispatch(0, &object(3, ObjectKind::Snitch, 1.0, 2.0), now);
        dispatcher.dispatch(0, &object(4, ObjectKind::Other("Wall".into()), 0.0, 0.0), now);

        let world = world.lock();
        assert!(world.has_pickup(PickupKind::Ammo, Position::new(5.0, 5.0)));
        assert!(world.has_pickup(PickupKind::Health, Position::new(-5.0, 5.0)));
        assert_eq!(world.snitch(), Some(Position::new(1.0, 2.0)));
    }

    #[test]
    fn test_ammo_pickup_refills_and_clears_nearby() {
        let (dispatcher, world, inboxes) = setup(2);
        let now = Instant::now();
        dispatcher.dispatch(1, &tank(11, "fleet:1", 0.0, 0.0, 3), now);
        dispatcher.dispatch(1, &object(1, ObjectKind::AmmoPickup, 3.0, 4.0), now);
        dispatcher.dispatch(1, &object(2, ObjectKind::AmmoPickup, 30.0, 0.0), now);
        drain(&inboxes[1]);

        dispatcher.dispatch(1, &Event::AmmoPickup, now);

        assert_eq!(drain(&inboxes[1]), vec![Directive::AmmoCollected]);
        let world = world.lock();
        assert!(!world.has_pickup(PickupKind::Ammo, Position::new(3.0, 4.0)));
        assert!(world.has_pickup(PickupKind::Ammo, Position::new(30.0, 0.0)));
    }

    #[test]
    fn test_health_pickup_only_clears_records() {
        let (dispatcher, world, inboxes) = setup(1);
        let now = Instant::now();
        dispatcher.dispatch(0, &tank(11, "fleet:0", 0.0, 0.0, 3), now);
        dispatcher.dispatch(0, &object(1, ObjectKind::HealthPickup, 1.0, 1.0), now);
        drain(&inboxes[0]);

        dispatcher.dispatch(0, &Event::HealthPickup, now);
        assert!(drain(&inboxes[0]).is_empty());
        assert_eq!(world.lock().pickups(PickupKind::Health).count(), 0);
    }

    #[test]
    fn test_kill_clears_enemies() {
        let (dispatcher, world, inboxes) = setup(2);
        dispatcher.dispatch(0, &tank(9, "rivals:0", 10.0, 0.0, 3), Instant::now());
        dispatcher.dispatch(0, &Event::Kill, Instant::now());

        assert_eq!(world.lock().enemy_count(), 0);
        assert_eq!(drain(&inboxes[0]), vec![Directive::Killed]);
        assert!(drain(&inboxes[1]).is_empty());
    }

    #[test]
    fn test_lifecycle_events_go_to_origin() {
        let (dispatcher, _world, inboxes) = setup(2);
        dispatcher.dispatch(1, &Event::Destroyed, Instant::now());
        dispatcher.dispatch(1, &Event::EnteredGoal, Instant::now());
        dispatcher.dispatch(1, &Event::HitDetected, Instant::now());
        dispatcher.dispatch(1, &Event::Unknown(200), Instant::now());

        assert_eq!(drain(&inboxes[1]), vec![Directive::Destroyed, Directive::EnteredGoal]);
        assert!(drain(&inboxes[0]).is_empty());
    }

    #[test]
    fn test_enemy_carrier_hunted_by_two_nearest() {
        let (dispatcher, world, inboxes) = setup(4);
        let now = Instant::now();
        dispatcher.dispatch(0, &tank(10, "fleet:0", 0.0, 0.0, 3), now);
        dispatcher.dispatch(0, &tank(11, "fleet:1", 40.0, 0.0, 3), now);
        dispatcher.dispatch(0, &tank(12, "fleet:2", 90.0, 0.0, 3), now);
        dispatcher.dispatch(0, &tank(13, "fleet:3", -50.0, 0.0, 3), now);
        dispatcher.dispatch(0, &object(5, ObjectKind::Snitch, 0.0, 0.0), now);
        dispatcher.dispatch(0, &tank(99, "rivals:1", 60.0, 0.0, 3), now);
        for inbox in &inboxes {
            drain(inbox);
        }

        dispatcher.dispatch(3, &Event::SnitchPickup { carrier: 99 }, now);

        let hunt = Directive::HuntCarrier {
            id: 99,
            position: Position::new(60.0, 0.0),
        };
        assert!(drain(&inboxes[0]).is_empty());
        assert_eq!(drain(&inboxes[1]), vec![hunt]);
        assert_eq!(drain(&inboxes[2]), vec![hunt]);
        assert!(drain(&inboxes[3]).is_empty());
        assert_eq!(world.lock().snitch(), None);
    }

    #[test]
    fn test_own_carrier_banks() {
        let (dispatcher, _world, inboxes) = setup(2);
        dispatcher.dispatch(0, &tank(11, "fleet:1", 0.0, 0.0, 3), Instant::now());
        drain(&inboxes[1]);

        dispatcher.dispatch(0, &Event::SnitchPickup { carrier: 11 }, Instant::now());
        assert_eq!(drain(&inboxes[1]), vec![Directive::Bank]);
        assert!(drain(&inboxes[0]).is_empty());
    }

    #[test]
    fn test_unknown_carrier_ignored() {
        let (dispatcher, _world, inboxes) = setup(2);
        dispatcher.dispatch(0, &Event::SnitchPickup { carrier: 77 }, Instant::now());
        assert!(inboxes.iter().all(|inbox| drain(inbox).is_empty()));
    }

    #[test]
    fn test_snitch_seekers_are_healthiest() {
        let (dispatcher, _world, inboxes) = setup(4);
        let now = Instant::now();
        dispatcher.dispatch(0, &tank(10, "fleet:0", 0.0, 0.0, 1), now);
        dispatcher.dispatch(0, &tank(11, "fleet:1", 0.0, 0.0, 2), now);
        dispatcher.dispatch(0, &tank(12, "fleet:2", 0.0, 0.0, 3), now);
        dispatcher.dispatch(0, &tank(13, "fleet:3", 0.0, 0.0, 3), now);
        for inbox in &inboxes {
            drain(inbox);
        }

        dispatcher.dispatch(0, &Event::SnitchAppeared, now);

        assert!(drain(&inboxes[0]).is_empty());
        assert!(drain(&inboxes[1]).is_empty());
        assert_eq!(drain(&inboxes[2]), vec![Directive::SeekSnitch]);
        assert_eq!(drain(&inboxes[3]), vec![Directive::SeekSnitch]);
    }

    #[test]
    fn test_snitch_seekers_before_any_report() {
        let (dispatcher, _world, inboxes) = setup(3);
        dispatcher.dispatch(2, &Event::SnitchAppeared, Instant::now());

        assert_eq!(drain(&inboxes[0]), vec![Directive::SeekSnitch]);
        assert_eq!(drain(&inboxes[1]), vec![Directive::SeekSnitch]);
        assert!(drain(&inboxes[2]).is_empty());
    }
}
