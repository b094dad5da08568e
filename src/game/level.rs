//! Static level table

use super::physics::Point;

/// Immutable description of a level
#[derive(Debug)]
pub struct LevelDef {
    /// Enemies to defeat to clear the level (all of them are spawned)
    pub enemies_to_defeat: u32,
    pub enemy_spawns: &'static [Point],
    pub pickup_spawns: &'static [Point],
}

pub const LEVELS: [LevelDef; 2] = [
    LevelDef {
        enemies_to_defeat: 10,
        enemy_spawns: &[
            Point::new(36.0, 428.0),
            Point::new(1042.0, 129.0),
            Point::new(1764.0, 428.0),
        ],
        pickup_spawns: &[
            Point::new(471.0, 172.0),
            Point::new(1250.0, 228.0),
            Point::new(1310.0, 709.0),
        ],
    },
    LevelDef {
        enemies_to_defeat: 15,
        enemy_spawns: &[
            Point::new(994.0, 134.0),
            Point::new(1648.0, 134.0),
            Point::new(1648.0, 907.0),
        ],
        pickup_spawns: &[
            Point::new(52.0, 469.0),
            Point::new(1312.0, 168.0),
            Point::new(1189.0, 887.0),
        ],
    },
];

/// Index of the last level; clearing it wins the game
pub const FINAL_LEVEL: usize = LEVELS.len() - 1;

/// Level by index, clamped to the table
pub fn level(index: usize) -> &'static LevelDef {
    &LEVELS[index.min(FINAL_LEVEL)]
}

/// Starting position of the host's player
pub const HOST_START: Point = Point::new(368.0, 800.0);
/// Starting position of the peer's player
pub const PEER_START: Point = Point::new(733.0, 800.0);
