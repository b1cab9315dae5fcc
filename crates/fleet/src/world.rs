//! World state cache shared by every agent.
//!
//! Holds what the team has recently seen: enemy tanks, pickups, the snitch,
//! and the last report of each of our own tanks. Records age out, because the
//! server stops reporting objects that leave every tank's view.

use protocol::{ObjectId, Position};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::WorldConfig;
use crate::geometry::distance;

/// Pickup types tracked by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickupKind {
    Ammo,
    Health,
}

/// Last report of an enemy tank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyRecord {
    pub position: Position,
    pub last_seen: Instant,
}

/// Last report of a pickup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupRecord {
    pub kind: PickupKind,
    pub position: Position,
    pub seen_at: Instant,
}

/// Last report of one of our own tanks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Teammate {
    pub index: usize,
    pub id: ObjectId,
    pub position: Position,
    pub health: u32,
}

/// The world cache.
#[derive(Debug)]
pub struct World {
    enemy_ttl: Duration,
    pickup_ttl: Duration,

    /// Enemies by server id. Ordered so ties resolve to the lowest id.
    enemies: BTreeMap<ObjectId, EnemyRecord>,
    /// Pickups in the order they were first seen.
    pickups: Vec<PickupRecord>,
    snitch: Option<Position>,

    /// Server object id -> agent index, for our own tanks.
    agents_by_object: HashMap<ObjectId, usize>,
    /// Agent index -> last report.
    teammates: BTreeMap<usize, Teammate>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(&WorldConfig::default())
    }
}

impl World {
    /// Create an empty world with the configured staleness windows.
    pub fn new(config: &WorldConfig) -> Self {
        Self::with_windows(config.enemy_ttl(), config.pickup_ttl())
    }

    pub fn with_windows(enemy_ttl: Duration, pickup_ttl: Duration) -> Self {
        Self {
            enemy_ttl,
            pickup_ttl,
            enemies: BTreeMap::new(),
            pickups: Vec::new(),
            snitch: None,
            agents_by_object: HashMap::new(),
            teammates: BTreeMap::new(),
        }
    }

    /// Insert or refresh an enemy. A report with zero health removes it.
    pub fn upsert_enemy(&mut self, id: ObjectId, position: Position, health: u32, now: Instant) {
        if health == 0 {
            if self.enemies.remove(&id).is_some() {
                debug!("Enemy {} destroyed", id);
            }
            return;
        }
        self.enemies.insert(
            id,
            EnemyRecord {
                position,
                last_seen: now,
            },
        );
    }

    /// Remove every enemy not reported within the staleness window.
    pub fn evict_stale_enemies(&mut self, now: Instant) -> usize {
        let ttl = self.enemy_ttl;
        let before = self.enemies.len();
        self.enemies.retain(|_, enemy| is_fresh(enemy, ttl, now));
        before - self.enemies.len()
    }

    /// An enemy reported within the staleness window. Older records are
    /// hidden even before the sweeper removes them.
    pub fn enemy(&self, id: ObjectId, now: Instant) -> Option<&EnemyRecord> {
        self.enemies
            .get(&id)
            .filter(|enemy| is_fresh(enemy, self.enemy_ttl, now))
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }

    pub fn clear_enemies(&mut self) {
        self.enemies.clear();
    }

    /// Closest live enemy to `from`. Exact ties go to the lowest id.
    pub fn nearest_enemy(&self, from: Position, now: Instant) -> Option<ObjectId> {
        self.enemies
            .iter()
            .filter(|(_, enemy)| is_fresh(enemy, self.enemy_ttl, now))
            .map(|(id, enemy)| (*id, distance(from, enemy.position)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(id, _)| id)
    }

    pub fn add_ammo_pickup(&mut self, position: Position, now: Instant) {
        self.add_pickup(PickupKind::Ammo, position, now);
    }

    pub fn add_health_pickup(&mut self, position: Position, now: Instant) {
        self.add_pickup(PickupKind::Health, position, now);
    }

    /// Record a pickup. A pickup already known at the same spot is refreshed.
    pub fn add_pickup(&mut self, kind: PickupKind, position: Position, now: Instant) {
        match self
            .pickups
            .iter_mut()
            .find(|p| p.kind == kind && p.position == position)
        {
            Some(existing) => existing.seen_at = now,
            None => self.pickups.push(PickupRecord {
                kind,
                position,
                seen_at: now,
            }),
        }
    }

    /// Remove ammo pickups not reported within the pickup window.
    pub fn evict_stale_ammo(&mut self, now: Instant) -> usize {
        self.evict_stale_pickups(PickupKind::Ammo, now)
    }

    /// Remove health pickups not reported within the pickup window.
    pub fn evict_stale_health(&mut self, now: Instant) -> usize {
        self.evict_stale_pickups(PickupKind::Health, now)
    }

    fn evict_stale_pickups(&mut self, kind: PickupKind, now: Instant) -> usize {
        let ttl = self.pickup_ttl;
        let before = self.pickups.len();
        self.pickups
            .retain(|p| p.kind != kind || now.saturating_duration_since(p.seen_at) <= ttl);
        before - self.pickups.len()
    }

    /// Drop pickups of `kind` within `radius` of `position`.
    pub fn remove_pickup_near(&mut self, kind: PickupKind, position: Position, radius: f64) -> usize {
        let before = self.pickups.len();
        self.pickups
            .retain(|p| p.kind != kind || distance(p.position, position) >= radius);
        before - self.pickups.len()
    }

    pub fn has_pickup(&self, kind: PickupKind, position: Position) -> bool {
        self.pickups
            .iter()
            .any(|p| p.kind == kind && p.position == position)
    }

    pub fn pickups(&self, kind: PickupKind) -> impl Iterator<Item = &PickupRecord> {
        self.pickups.iter().filter(move |p| p.kind == kind)
    }

    /// Closest pickup of `kind`. Exact ties go to the first one seen.
    pub fn nearest_pickup(&self, kind: PickupKind, from: Position) -> Option<Position> {
        self.pickups(kind)
            .map(|p| (p.position, distance(from, p.position)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(position, _)| position)
    }

    pub fn set_snitch(&mut self, position: Option<Position>) {
        self.snitch = position;
    }

    pub fn snitch(&self) -> Option<Position> {
        self.snitch
    }

    /// Remember the latest report of one of our tanks.
    pub fn record_teammate(&mut self, index: usize, id: ObjectId, position: Position, health: u32) {
        self.agents_by_object.insert(id, index);
        self.teammates.insert(
            index,
            Teammate {
                index,
                id,
                position,
                health,
            },
        );
    }

    /// Which of our agents owns server object `id`, if any.
    pub fn map_object_to_agent(&self, id: ObjectId) -> Option<usize> {
        self.agents_by_object.get(&id).copied()
    }

    pub fn teammate(&self, index: usize) -> Option<&Teammate> {
        self.teammates.get(&index)
    }

    /// Teammates ordered by agent index.
    pub fn teammates(&self) -> impl Iterator<Item = &Teammate> {
        self.teammates.values()
    }

    /// Run every eviction. Returns the number of records removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        self.evict_stale_enemies(now) + self.evict_stale_ammo(now) + self.evict_stale_health(now)
    }
}

fn is_fresh(enemy: &EnemyRecord, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(enemy.last_seen) <= ttl
}

/// Handle to the world shared between agent workers and the sweeper.
///
/// One coarse lock covers every record group; updates arrive at message
/// rate, not fast enough for finer locking to matter.
#[derive(Debug, Clone, Default)]
pub struct SharedWorld {
    inner: Arc<Mutex<World>>,
}

impl SharedWorld {
    pub fn new(world: World) -> Self {
        Self {
            inner: Arc::new(Mutex::new(world)),
        }
    }

    /// Lock the world. A worker that panicked while holding the lock leaves
    /// plain data behind, so the poison flag is ignored.
    pub fn lock(&self) -> MutexGuard<'_, World> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::with_windows(Duration::from_secs(3), Duration::from_secs(15))
    }

    #[test]
    fn test_enemy_eviction_window() {
        let t0 = Instant::now();
        let mut w = world();
        w.upsert_enemy(1, Position::new(5.0, 0.0), 3, t0);
        w.upsert_enemy(2, Position::new(9.0, 0.0), 3, t0);
        w.upsert_enemy(2, Position::new(9.0, 0.0), 3, t0 + Duration::from_millis(2900));

        let evicted = w.evict_stale_enemies(t0 + Duration::from_millis(3100));
        assert_eq!(evicted, 1);
        let later = t0 + Duration::from_millis(3100);
        assert!(w.enemy(1, later).is_none());
        assert_eq!(w.nearest_enemy(Position::ZERO, later), Some(2));
    }

    #[test]
    fn test_stale_enemy_hidden_before_sweep() {
        let t0 = Instant::now();
        let mut w = world();
        w.upsert_enemy(9, Position::new(10.0, 0.0), 3, t0);
        w.upsert_enemy(4, Position::new(50.0, 0.0), 3, t0 + Duration::from_secs(1));

        let later = t0 + Duration::from_millis(3500);
        assert_eq!(w.enemy_count(), 2);
        assert!(w.enemy(9, later).is_none());
        assert!(w.enemy(4, later).is_some());
        assert_eq!(w.nearest_enemy(Position::ZERO, later), Some(4));

        let much_later = t0 + Duration::from_secs(5);
        assert_eq!(w.nearest_enemy(Position::ZERO, much_later), None);
    }

    #[test]
    fn test_zero_health_removes_enemy() {
        let now = Instant::now();
        let mut w = world();
        w.upsert_enemy(7, Position::new(1.0, 1.0), 2, now);
        w.upsert_enemy(7, Position::new(1.0, 1.0), 0, now);
        assert!(w.enemy(7, now).is_none());

        // Unknown enemy reported dead is not inserted.
        w.upsert_enemy(8, Position::new(1.0, 1.0), 0, now);
        assert_eq!(w.enemy_count(), 0);
    }

    #[test]
    fn test_nearest_enemy_strict_and_ties() {
        let now = Instant::now();
        let mut w = world();
        w.upsert_enemy(5, Position::new(10.0001, 0.0), 1, now);
        w.upsert_enemy(9, Position::new(10.0, 0.0), 1, now);
        assert_eq!(w.nearest_enemy(Position::ZERO, now), Some(9));

        let mut w = world();
        w.upsert_enemy(12, Position::new(0.0, 10.0), 1, now);
        w.upsert_enemy(4, Position::new(10.0, 0.0), 1, now);
        w.upsert_enemy(8, Position::new(-10.0, 0.0), 1, now);
        assert_eq!(w.nearest_enemy(Position::ZERO, now), Some(4));

        assert_eq!(world().nearest_enemy(Position::ZERO, now), None);
    }

    #[test]
    fn test_ammo_expiry() {
        let t0 = Instant::now();
        let mut w = world();
        w.add_ammo_pickup(Position::new(5.0, 5.0), t0);
        w.add_ammo_pickup(Position::new(50.0, 50.0), t0 + Duration::from_secs(10));

        w.evict_stale_ammo(t0 + Duration::from_secs(16));
        assert_eq!(
            w.nearest_pickup(PickupKind::Ammo, Position::ZERO),
            Some(Position::new(50.0, 50.0))
        );
    }

    #[test]
    fn test_pickup_refresh_does_not_duplicate() {
        let t0 = Instant::now();
        let mut w = world();
        let spot = Position::new(3.0, 4.0);
        w.add_ammo_pickup(spot, t0);
        w.add_ammo_pickup(spot, t0 + Duration::from_secs(10));
        assert_eq!(w.pickups(PickupKind::Ammo).count(), 1);

        w.evict_stale_ammo(t0 + Duration::from_secs(20));
        assert!(w.has_pickup(PickupKind::Ammo, spot));
    }

    #[test]
    fn test_remove_pickup_near_respects_kind() {
        let now = Instant::now();
        let mut w = world();
        w.add_ammo_pickup(Position::new(1.0, 1.0), now);
        w.add_ammo_pickup(Position::new(30.0, 30.0), now);
        w.add_health_pickup(Position::new(1.0, 1.0), now);

        assert_eq!(w.remove_pickup_near(PickupKind::Ammo, Position::ZERO, 10.0), 1);
        assert_eq!(w.pickups(PickupKind::Ammo).count(), 1);
        assert!(w.has_pickup(PickupKind::Health, Position::new(1.0, 1.0)));
        assert_eq!(w.nearest_pickup(PickupKind::Health, Position::ZERO), Some(Position::new(1.0, 1.0)));
    }

    #[test]
    fn test_teammates_and_object_mapping() {
        let mut w = world();
        w.record_teammate(2, 100, Position::new(1.0, 2.0), 3);
        w.record_teammate(0, 101, Position::new(0.0, 0.0), 1);

        assert_eq!(w.map_object_to_agent(100), Some(2));
        assert_eq!(w.map_object_to_agent(555), None);
        let order: Vec<usize> = w.teammates().map(|t| t.index).collect();
        assert_eq!(order, vec![0, 2]);
        assert_eq!(w.teammate(2).map(|t| t.health), Some(3));
    }

    #[test]
    fn test_sweep_runs_all_evictions() {
        let t0 = Instant::now();
        let mut w = world();
        w.upsert_enemy(1, Position::ZERO, 1, t0);
        w.add_ammo_pickup(Position::ZERO, t0);
        w.add_health_pickup(Position::new(2.0, 2.0), t0);
        w.set_snitch(Some(Position::new(4.0, 4.0)));

        assert_eq!(w.sweep(t0 + Duration::from_secs(1)), 0);
        assert_eq!(w.sweep(t0 + Duration::from_secs(16)), 3);
        assert_eq!(w.snitch(), Some(Position::new(4.0, 4.0)));
    }

    #[test]
    fn test_shared_world_across_threads() {
        let shared = SharedWorld::default();
        let now = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.lock().upsert_enemy(i, Position::new(i as f64, 0.0), 1, now);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shared.lock().enemy_count(), 4);
    }
}
