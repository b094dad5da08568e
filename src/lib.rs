//! Jazz for the Dead - two-player cooperative LAN arcade game
//!
//! One side hosts the session and owns the simulation: enemies, pickups,
//! combat, team health and the leaderboard. The other side joins as the
//! peer and mirrors the host. Both exchange one frame per tick at 60 Hz.

pub mod config;
pub mod frontend;
pub mod game;
pub mod net;
pub mod session;
pub mod store;
pub mod util;
