//! Arena geometry, movement speeds and bounding-box tests

use serde::{Deserialize, Serialize};

use crate::util::time::tick_delta;

pub const SCREEN_WIDTH: f32 = 1920.0;
pub const SCREEN_HEIGHT: f32 = 1080.0;

/// Scale applied to the player sprites; the hitbox and bounds derive from it
pub const PLAYER_SCALE: f32 = 0.6;

/// Player speed in pixels per second
const PLAYER_VELOCITY: f32 = 280.0;
/// Enemies move at a fraction of the player's diagonal speed
const ENEMY_VELOCITY_MULT: f32 = 0.4;

/// A position on screen (top-left anchored, y grows downwards).
/// Serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Axis-aligned bounding rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn at(origin: Point, w: f32, h: f32) -> Self {
        Self::new(origin.x, origin.y, w, h)
    }

    /// Strict overlap; rectangles that only share an edge do not collide
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Walkable area for the players (top-left corner of the sprite)
#[derive(Debug, Clone, Copy)]
pub struct ArenaBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Default for ArenaBounds {
    fn default() -> Self {
        Self {
            min_x: 40.0,
            max_x: SCREEN_WIDTH - 220.0 * PLAYER_SCALE - 40.0,
            min_y: 20.0,
            max_y: SCREEN_HEIGHT - 350.0 * PLAYER_SCALE - 55.0,
        }
    }
}

/// Stateless movement helpers
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Per-tick player step when moving along one axis
    pub fn straight_speed() -> f32 {
        PLAYER_VELOCITY * tick_delta()
    }

    /// Per-axis player step when moving along both axes, so the diagonal
    /// is not faster than a straight line
    pub fn diagonal_speed() -> f32 {
        let v = Self::straight_speed();
        (v * v / 2.0).sqrt()
    }

    /// Per-axis enemy step
    pub fn enemy_speed() -> f32 {
        Self::diagonal_speed() * ENEMY_VELOCITY_MULT
    }

    /// Step `from` towards `to` by at most `speed`, never overshooting
    pub fn step_toward(from: f32, to: f32, speed: f32, moving_negative: bool) -> f32 {
        let step = speed.min((from - to).abs());
        if moving_negative {
            from - step
        } else {
            from + step
        }
    }
}
