//! Seam to the presentation layer
//!
//! Rendering, audio, raw input capture and menus live behind `Frontend`.
//! The session drivers only describe what to show and what to play.

pub mod headless;

pub use headless::HeadlessFrontend;

use crate::game::{CharacterKind, MoveInput, PlayerEntity, RemotePlayer, World};
use crate::net::protocol::Standing;

/// Input sampled once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub movement: MoveInput,
    /// Escape or window close
    pub quit: bool,
}

/// A line of text the session needs from the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    TeamName,
    HostAddress,
    /// Host confirms the start of the next level; the answer is ignored
    StartGame,
}

/// Sound effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Swing,
    Kill,
    Pickup,
    /// A pickup appeared in the arena
    PickupSpawned,
    Damage,
    CountdownBeat,
    LevelCleared,
    Victory,
    Defeat,
}

/// What is on screen during a tick of play
#[derive(Debug)]
pub struct GameplayView<'a> {
    pub level_index: usize,
    pub health: u8,
    pub local: &'a PlayerEntity,
    pub remote: &'a RemotePlayer,
    pub world: &'a World,
}

/// Final screen
#[derive(Debug)]
pub struct LeaderboardView<'a> {
    pub team_name: &'a str,
    pub score: u32,
    pub victory: bool,
    pub top_teams: &'a [Standing],
    /// Absent when the host could not rank the score
    pub rank: Option<u32>,
}

#[derive(Debug)]
pub enum Scene<'a> {
    /// Host waiting for the peer to connect
    Lobby { port: u16 },
    /// Peer connected, waiting for the team name
    AwaitingTeam,
    PreGame {
        team_name: &'a str,
        local: CharacterKind,
        level_index: usize,
    },
    Countdown { remaining: u32 },
    Gameplay(GameplayView<'a>),
    LevelCleared { level_score: u32 },
    Leaderboard(LeaderboardView<'a>),
}

/// Presentation collaborator. Calls may block; the session loop is the only
/// caller.
pub trait Frontend {
    fn poll_input(&mut self) -> InputState;

    /// Ask for a line of text, showing `error` inline when the previous
    /// answer was rejected. `None` means the user quit.
    fn prompt(&mut self, prompt: Prompt, error: Option<&str>) -> Option<String>;

    fn render(&mut self, scene: &Scene<'_>);

    fn play(&mut self, cue: Cue);
}
