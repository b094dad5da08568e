//! Wire message definitions
//! Per-tick frame messages are JSON; control messages are plain text

use serde::{Deserialize, Serialize};

use crate::game::animation::{AnimKey, CharacterKind};
use crate::game::physics::Point;
use crate::game::world::Enemy;

/// Upper bound for any single payload
pub const MAX_PAYLOAD_BYTES: usize = 2048;

/// Literal payload of the start signal
pub const START_SIGNAL: &str = "start";

/// One side's state for a tick.
///
/// Peer→host frames carry only the entity fields. Host→peer frames also
/// carry the authoritative world: health, enemies, pickups and the stop flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameState {
    pub animation_key: AnimKey,
    pub animation_index: u32,
    pub flipped: bool,
    pub position: Point,
    pub attack_charges: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_health: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enemies: Option<Vec<Enemy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickups: Option<Vec<usize>>,
    #[serde(default)]
    pub stop: bool,
}

impl FrameState {
    /// Entity-only frame (peer→host)
    pub fn entity(
        animation_key: AnimKey,
        animation_index: u32,
        flipped: bool,
        position: Point,
        attack_charges: u8,
    ) -> Self {
        Self {
            animation_key,
            animation_index,
            flipped,
            position,
            attack_charges,
            team_health: None,
            enemies: None,
            pickups: None,
            stop: false,
        }
    }

    /// Attach the host's authoritative world state
    pub fn with_world(
        mut self,
        team_health: u8,
        enemies: Vec<Enemy>,
        pickups: Vec<usize>,
        stop: bool,
    ) -> Self {
        self.team_health = Some(team_health);
        self.enemies = Some(enemies);
        self.pickups = Some(pickups);
        self.stop = stop;
        self
    }

    /// Whether this frame carries the host's world state
    pub fn is_authoritative(&self) -> bool {
        self.team_health.is_some() && self.enemies.is_some() && self.pickups.is_some()
    }
}

/// Serialize a frame for the wire
pub fn encode(state: &FrameState) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(state).map_err(ProtocolError::Encode)
}

/// Parse a received frame. Empty or unparseable payloads are `Malformed`;
/// callers skip the update for that tick.
pub fn decode(payload: &[u8]) -> Result<FrameState, ProtocolError> {
    if payload.is_empty() {
        return Err(ProtocolError::Malformed("empty payload".to_string()));
    }
    serde_json::from_slice(payload).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// A leaderboard row as sent to the peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub team_name: String,
    pub score: u32,
}

/// Top teams plus the rank of this session's score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardPayload {
    pub top_teams: Vec<Standing>,
    pub team_rank: u32,
}

pub fn encode_leaderboard(payload: &LeaderboardPayload) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(payload).map_err(ProtocolError::Encode)
}

pub fn decode_leaderboard(payload: &[u8]) -> Result<LeaderboardPayload, ProtocolError> {
    if payload.is_empty() {
        return Err(ProtocolError::Malformed("empty payload".to_string()));
    }
    serde_json::from_slice(payload).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Out-of-band control messages, sent host→peer outside the tick exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMsg {
    TeamName(String),
    /// The character the receiving peer plays
    Role(CharacterKind),
    Start,
    LevelScore(u32),
    TotalScore(u32),
}

/// Which control message a receiver is waiting for. Payloads are bare text,
/// so the receiver's phase decides how to read them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    TeamName,
    Role,
    Start,
    LevelScore,
    TotalScore,
}

impl ControlMsg {
    pub fn kind(&self) -> ControlKind {
        match self {
            Self::TeamName(_) => ControlKind::TeamName,
            Self::Role(_) => ControlKind::Role,
            Self::Start => ControlKind::Start,
            Self::LevelScore(_) => ControlKind::LevelScore,
            Self::TotalScore(_) => ControlKind::TotalScore,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::TeamName(name) => name.as_bytes().to_vec(),
            Self::Role(kind) => kind.letter().to_string().into_bytes(),
            Self::Start => START_SIGNAL.as_bytes().to_vec(),
            Self::LevelScore(score) | Self::TotalScore(score) => score.to_string().into_bytes(),
        }
    }

    pub fn decode(expected: ControlKind, payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.is_empty() {
            return Err(ProtocolError::Malformed("empty payload".to_string()));
        }
        let text = std::str::from_utf8(payload)
            .map_err(|e| ProtocolError::Malformed(e.to_string()))?
            .trim();

        let malformed = || ProtocolError::Malformed(format!("unexpected {expected:?}: {text:?}"));
        match expected {
            ControlKind::TeamName if !text.is_empty() => Ok(Self::TeamName(text.to_string())),
            ControlKind::TeamName => Err(malformed()),
            ControlKind::Role => CharacterKind::from_letter(text)
                .map(Self::Role)
                .ok_or_else(malformed),
            ControlKind::Start if text == START_SIGNAL => Ok(Self::Start),
            ControlKind::Start => Err(malformed()),
            ControlKind::LevelScore => text.parse().map(Self::LevelScore).map_err(|_| malformed()),
            ControlKind::TotalScore => text.parse().map(Self::TotalScore).map_err(|_| malformed()),
        }
    }
}

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}
