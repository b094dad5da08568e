//! Enemy and pickup simulation (host-authoritative)
//!
//! The host spawns, moves and removes enemies and pickups. The peer keeps a
//! `World` too, but only ever overwrites it with what the host reports.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::util::time::tick_delta;

use super::animation::{ENEMY_ANIM_STEP, ENEMY_WALK_FRAMES};
use super::level::{level, LevelDef};
use super::physics::{PhysicsSystem, Point, PLAYER_SCALE};

/// Pickups available on the map at the same time
pub const MAX_PICKUPS: usize = 3;

/// Per-second spawn chances; each tick is an independent trial at `rate * dt`
const ENEMY_SPAWN_RATE: f32 = 0.25;
const PICKUP_SPAWN_RATE: f32 = 0.07;

/// Enemies aim at this offset from the player's sprite origin
const TARGET_OFFSET_X: f32 = 20.0 * PLAYER_SCALE;
const TARGET_OFFSET_Y: f32 = 90.0 * PLAYER_SCALE;
/// Horizontal gap below which an enemy keeps its current facing
const TURN_INERTIA: f32 = 30.0;

/// An enemy in play. On the wire: `[position, progress, facing_right]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Point, f32, bool)", into = "(Point, f32, bool)")]
pub struct Enemy {
    pub position: Point,
    /// Animation progress, wraps over the walk cycle
    pub progress: f32,
    pub facing_right: bool,
}

impl Enemy {
    pub fn spawn_at(position: Point) -> Self {
        Self {
            position,
            progress: 0.0,
            facing_right: false,
        }
    }

    /// Walk-cycle frame to display
    pub fn frame_index(&self) -> u32 {
        (self.progress.max(0.0).floor() as u32).min(ENEMY_WALK_FRAMES - 2)
    }

    /// Advance animation and step towards the nearer of the two players.
    /// Ties go to `host`.
    pub fn advance(&mut self, host: Point, peer: Point, speed: f32) {
        self.progress += ENEMY_ANIM_STEP;
        if self.progress > (ENEMY_WALK_FRAMES - 1) as f32 {
            self.progress = 0.0;
        }

        let goal = if self.position.distance(host) <= self.position.distance(peer) {
            host
        } else {
            peer
        };

        let gap_x = (self.position.x - goal.x).abs();
        let moving_left = goal.x + TARGET_OFFSET_X < self.position.x;
        let new_x = PhysicsSystem::step_toward(self.position.x, goal.x, speed, moving_left);
        if gap_x + TARGET_OFFSET_X > TURN_INERTIA {
            self.facing_right = !moving_left;
        }

        let moving_up = goal.y + TARGET_OFFSET_Y < self.position.y;
        let new_y = PhysicsSystem::step_toward(self.position.y, goal.y, speed, moving_up);

        self.position = Point::new(new_x, new_y);
    }
}

impl From<(Point, f32, bool)> for Enemy {
    fn from((position, progress, facing_right): (Point, f32, bool)) -> Self {
        Self {
            position,
            progress,
            facing_right,
        }
    }
}

impl From<Enemy> for (Point, f32, bool) {
    fn from(e: Enemy) -> Self {
        (e.position, e.progress, e.facing_right)
    }
}

/// What spawned during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnReport {
    pub enemy: bool,
    pub pickup: Option<usize>,
}

/// Enemies and pickups of the current level
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub level_index: usize,
    pub enemies: Vec<Enemy>,
    /// Occupied pickup slots (indices into the level's pickup spawns)
    pub pickups: Vec<usize>,
    pub remaining_to_spawn: u32,
}

impl World {
    pub fn for_level(level_index: usize) -> Self {
        Self {
            level_index,
            enemies: Vec::new(),
            pickups: Vec::new(),
            remaining_to_spawn: level(level_index).enemies_to_defeat,
        }
    }

    pub fn level(&self) -> &'static LevelDef {
        level(self.level_index)
    }

    /// Concurrent pickup cap; never more than the level has slots
    pub fn max_pickups(&self) -> usize {
        MAX_PICKUPS.min(self.level().pickup_spawns.len())
    }

    /// Run this tick's spawn trials
    pub fn spawn_trials<R: Rng>(&mut self, rng: &mut R) -> SpawnReport {
        SpawnReport {
            enemy: self.try_spawn_enemy(rng),
            pickup: self.try_spawn_pickup(rng),
        }
    }

    /// One Bernoulli trial for an enemy spawn
    pub fn try_spawn_enemy<R: Rng>(&mut self, rng: &mut R) -> bool {
        let spawns = self.level().enemy_spawns;
        if self.remaining_to_spawn == 0 || spawns.is_empty() {
            return false;
        }
        if rng.gen::<f32>() >= ENEMY_SPAWN_RATE * tick_delta() {
            return false;
        }

        let position = spawns[rng.gen_range(0..spawns.len())];
        self.enemies.push(Enemy::spawn_at(position));
        self.remaining_to_spawn -= 1;
        debug!(
            x = position.x,
            y = position.y,
            remaining = self.remaining_to_spawn,
            "Enemy spawned"
        );
        true
    }

    /// One Bernoulli trial for a pickup spawn into a free slot
    pub fn try_spawn_pickup<R: Rng>(&mut self, rng: &mut R) -> Option<usize> {
        if self.pickups.len() >= self.max_pickups() {
            return None;
        }
        if rng.gen::<f32>() >= PICKUP_SPAWN_RATE * tick_delta() {
            return None;
        }

        let slots = self.level().pickup_spawns.len();
        let slot = loop {
            let candidate = rng.gen_range(0..slots);
            if !self.pickups.contains(&candidate) {
                break candidate;
            }
        };
        self.pickups.push(slot);
        debug!(slot, "Pickup spawned");
        Some(slot)
    }

    /// Move every enemy towards its nearer player
    pub fn move_enemies(&mut self, host: Point, peer: Point) {
        let speed = PhysicsSystem::enemy_speed();
        for enemy in &mut self.enemies {
            enemy.advance(host, peer, speed);
        }
    }

    /// Replace the lists with the host's. True when a pickup appeared.
    pub fn mirror(&mut self, enemies: Vec<Enemy>, pickups: Vec<usize>) -> bool {
        let spawned = pickups.len() > self.pickups.len();
        self.enemies = enemies;
        self.pickups = pickups;
        spawned
    }

    pub fn pickup_position(&self, slot: usize) -> Option<Point> {
        self.level().pickup_spawns.get(slot).copied()
    }
}
