//! Game simulation modules

pub mod animation;
pub mod combat;
pub mod level;
pub mod physics;
pub mod player;
pub mod world;

pub use animation::{AnimKey, CharacterKind};
pub use combat::{CombatSystem, Contender, Ledger, LevelEnd, TeamHealth};
pub use physics::Point;
pub use player::{MoveInput, PlayerEntity, RemotePlayer};
pub use world::{Enemy, World};
