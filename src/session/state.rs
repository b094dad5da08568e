//! Session aggregate and phase machine
//!
//! Host and peer each own one `Session`. Phases only move on explicit
//! signals; a signal that does not fit the current phase is rejected and
//! leaves everything as it was.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use uuid::Uuid;

use crate::game::combat::{CombatSystem, LevelEnd, TeamHealth, NEXT_LEVEL_CHARGES};
use crate::game::level::{FINAL_LEVEL, HOST_START, PEER_START};
use crate::game::physics::Point;
use crate::game::{CharacterKind, PlayerEntity, RemotePlayer, World};

use super::SessionError;

/// Points per enemy killed
pub const ENEMY_POINTS: u32 = 10;
/// Points per remaining heart when a level ends
pub const HEALTH_POINTS: u32 = 20;

/// Which end of the connection this process is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Host,
    Peer,
}

impl Side {
    pub fn start_position(self) -> Point {
        match self {
            Side::Host => HOST_START,
            Side::Peer => PEER_START,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Side::Host => Side::Peer,
            Side::Peer => Side::Host,
        }
    }
}

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the connection
    Lobby,
    /// Team name and roles being exchanged
    RoleNegotiation,
    /// Waiting for the start signal
    PreGame,
    Countdown,
    Gameplay,
    /// First level cleared, score shown
    LevelTransition,
    /// Terminal
    Leaderboard { victory: bool },
}

/// Inputs to the phase machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    ConnectionEstablished,
    TeamNameExchanged(String),
    /// The character this side plays
    RolesAssigned(CharacterKind),
    Start,
    CountdownElapsed,
    GameplayStopped(LevelEnd),
    LevelScoreExchanged,
}

/// Everything one side knows about the running session
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub side: Side,
    phase: Phase,
    pub level_index: usize,
    pub health: TeamHealth,
    /// Running score over all finished levels
    pub score: u32,
    /// Kills on the current level (host-authoritative)
    pub enemies_killed: u32,
    pub team_name: Option<String>,
    local_kind: Option<CharacterKind>,
    pub local: PlayerEntity,
    pub remote: RemotePlayer,
    pub world: World,
    pub rng: ChaCha8Rng,
}

impl Session {
    /// New session in the lobby. Spawns are reproducible when `seed` is set.
    pub fn new(side: Side, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let placeholder = CharacterKind::Skeleton;
        Self {
            id: Uuid::new_v4(),
            side,
            phase: Phase::Lobby,
            level_index: 0,
            health: TeamHealth::full(),
            score: 0,
            enemies_killed: 0,
            team_name: None,
            local_kind: None,
            local: PlayerEntity::new(placeholder, side.start_position(), false),
            remote: RemotePlayer::new(placeholder.counterpart(), side.other().start_position()),
            world: World::for_level(0),
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn local_kind(&self) -> Option<CharacterKind> {
        self.local_kind
    }

    /// Apply a signal and return the new phase
    pub fn apply(&mut self, signal: Signal) -> Result<Phase, SessionError> {
        let next = match (self.phase, &signal) {
            (Phase::Lobby, Signal::ConnectionEstablished) => Phase::RoleNegotiation,
            (Phase::RoleNegotiation, Signal::TeamNameExchanged(name)) => {
                self.team_name = Some(name.clone());
                Phase::RoleNegotiation
            }
            (_, Signal::RolesAssigned(_)) if self.local_kind.is_some() => {
                return Err(SessionError::RolesAlreadyAssigned);
            }
            (Phase::RoleNegotiation, Signal::RolesAssigned(kind)) if self.team_name.is_some() => {
                self.set_roles(*kind);
                Phase::PreGame
            }
            (Phase::PreGame, Signal::Start) => Phase::Countdown,
            (Phase::Countdown, Signal::CountdownElapsed) => {
                self.local.enable_controls();
                Phase::Gameplay
            }
            (Phase::Gameplay, Signal::GameplayStopped(end)) => {
                self.local.disable_controls();
                match end {
                    LevelEnd::Defeat => Phase::Leaderboard { victory: false },
                    LevelEnd::Cleared if self.level_index < FINAL_LEVEL => Phase::LevelTransition,
                    LevelEnd::Cleared => Phase::Leaderboard { victory: true },
                }
            }
            (Phase::LevelTransition, Signal::LevelScoreExchanged) => {
                self.enter_next_level();
                Phase::PreGame
            }
            (phase, signal) => {
                return Err(SessionError::InvalidTransition {
                    phase,
                    signal: signal.clone(),
                })
            }
        };

        if next != self.phase {
            info!(
                session_id = %self.id,
                side = ?self.side,
                from = ?self.phase,
                to = ?next,
                level = self.level_index,
                "Phase change"
            );
        }
        self.phase = next;
        Ok(next)
    }

    /// Host only: pick this side's character at random and move on. Returns
    /// the character to announce to the peer.
    pub fn assign_roles(&mut self) -> Result<CharacterKind, SessionError> {
        let local = if self.rng.gen_bool(0.5) {
            CharacterKind::Skeleton
        } else {
            CharacterKind::Zombie
        };
        self.apply(Signal::RolesAssigned(local))?;
        Ok(local.counterpart())
    }

    /// Whether gameplay must stop, judged on the host's counters
    pub fn stop_condition(&self) -> Option<LevelEnd> {
        CombatSystem::level_end(
            self.health,
            self.enemies_killed,
            self.world.level().enemies_to_defeat,
        )
    }

    /// Score earned on the level that just ended
    pub fn level_score(&self) -> u32 {
        self.enemies_killed * ENEMY_POINTS + u32::from(self.health.get()) * HEALTH_POINTS
    }

    /// Add the level score to the running total and return it
    pub fn bank_level_score(&mut self) -> u32 {
        let earned = self.level_score();
        self.score += earned;
        earned
    }

    fn set_roles(&mut self, local: CharacterKind) {
        self.local_kind = Some(local);
        self.local = PlayerEntity::new(local, self.side.start_position(), false);
        self.remote = RemotePlayer::new(local.counterpart(), self.side.other().start_position());
    }

    fn enter_next_level(&mut self) {
        self.level_index = (self.level_index + 1).min(FINAL_LEVEL);
        self.health = TeamHealth::full();
        self.enemies_killed = 0;
        self.world = World::for_level(self.level_index);
        self.local
            .reset_for_level(self.side.start_position(), NEXT_LEVEL_CHARGES);
        self.remote
            .reset_for_level(self.side.other().start_position(), NEXT_LEVEL_CHARGES);
    }
}
