//! Per-entity animation state machine and damage immunity

use serde::{Deserialize, Serialize};

use crate::util::time::ticks_for_secs;

/// Fractional advance of a player animation counter per tick
pub const PLAYER_ANIM_STEP: f32 = 0.2;
/// Fractional advance of an enemy animation counter per tick
pub const ENEMY_ANIM_STEP: f32 = 0.2;
/// Frame count of the enemy walk cycle
pub const ENEMY_WALK_FRAMES: u32 = 12;
/// Post-damage immunity window (seconds at the nominal tick rate)
pub const IMMUNE_DURATION_SECS: f32 = 2.4;

/// The two playable characters. Each side of a session plays exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterKind {
    Skeleton,
    Zombie,
}

impl CharacterKind {
    /// Single-letter form used by the role control message
    pub fn letter(self) -> char {
        match self {
            Self::Skeleton => 's',
            Self::Zombie => 'z',
        }
    }

    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "s" => Some(Self::Skeleton),
            "z" => Some(Self::Zombie),
            _ => None,
        }
    }

    /// The character the other side plays
    pub fn counterpart(self) -> Self {
        match self {
            Self::Skeleton => Self::Zombie,
            Self::Zombie => Self::Skeleton,
        }
    }
}

/// Which animation an entity is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimKey {
    #[default]
    Idle,
    Walk,
    Attack,
}

/// Frame counts of each animation for a character
#[derive(Debug, Clone, Copy)]
pub struct FrameCounts {
    pub idle: u32,
    pub walk: u32,
    pub attack: u32,
}

impl FrameCounts {
    pub fn for_kind(kind: CharacterKind) -> Self {
        match kind {
            CharacterKind::Skeleton => Self {
                idle: 6,
                walk: 8,
                attack: 8,
            },
            CharacterKind::Zombie => Self {
                idle: 6,
                walk: 10,
                attack: 7,
            },
        }
    }

    pub fn get(&self, key: AnimKey) -> u32 {
        match key {
            AnimKey::Idle => self.idle,
            AnimKey::Walk => self.walk,
            AnimKey::Attack => self.attack,
        }
    }
}

/// Displayed frame for a counter: cycles through `0..=frame_count - 2`
pub fn frame_index(counter: f32, frame_count: u32) -> u32 {
    let span = frame_count.saturating_sub(1).max(1) as f32;
    (counter % span).floor() as u32
}

/// Progress counters of the three player animations
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimCounters {
    pub walk: f32,
    pub idle: f32,
    pub attack: f32,
}

/// Action state that drives animation selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionFlags {
    pub looking_left: bool,
    pub walking: bool,
    pub attacking: bool,
    pub movement_enabled: bool,
    pub attack_enabled: bool,
}

/// Result of one animation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimFrame {
    pub key: AnimKey,
    pub index: u32,
    pub flipped: bool,
}

/// Player animation state machine
pub struct Animator;

impl Animator {
    /// Advance one tick and select the frame to display.
    ///
    /// Walking wins over attacking, attacking over idling. The selected
    /// animation advances by [`PLAYER_ANIM_STEP`] and the other two restart.
    /// Finishing an attack cycle hands control back to the player.
    pub fn step(
        counts: &FrameCounts,
        counters: &mut AnimCounters,
        flags: &mut ActionFlags,
    ) -> AnimFrame {
        if counters.walk + PLAYER_ANIM_STEP > counts.walk as f32 {
            counters.walk = 0.0;
        }
        if counters.idle + PLAYER_ANIM_STEP > counts.idle as f32 {
            counters.idle = 0.0;
        }
        if counters.attack + PLAYER_ANIM_STEP > counts.attack as f32 {
            counters.attack = 0.0;
            flags.movement_enabled = true;
            flags.attack_enabled = true;
            flags.attacking = false;
        }

        let key = if flags.walking {
            AnimKey::Walk
        } else if flags.attacking {
            AnimKey::Attack
        } else {
            AnimKey::Idle
        };

        let active = match key {
            AnimKey::Walk => &mut counters.walk,
            AnimKey::Attack => &mut counters.attack,
            AnimKey::Idle => &mut counters.idle,
        };
        let index = frame_index(*active, counts.get(key));
        *active += PLAYER_ANIM_STEP;

        match key {
            AnimKey::Walk => {
                counters.idle = 0.0;
                counters.attack = 0.0;
            }
            AnimKey::Attack => {
                counters.idle = 0.0;
                counters.walk = 0.0;
            }
            AnimKey::Idle => {
                counters.walk = 0.0;
                counters.attack = 0.0;
            }
        }

        AnimFrame {
            key,
            index,
            // Source art faces left
            flipped: !flags.looking_left,
        }
    }
}

/// Temporary damage immunity, counted in ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Immunity {
    active: bool,
    elapsed: u32,
}

impl Immunity {
    /// Length of the immunity window in ticks
    pub fn duration_ticks() -> u32 {
        ticks_for_secs(IMMUNE_DURATION_SECS)
    }

    /// Start (or restart) the window from zero
    pub fn trigger(&mut self) {
        self.active = true;
        self.elapsed = 0;
    }

    /// Advance one tick; clears itself once the window has elapsed
    pub fn tick(&mut self) {
        if self.active {
            self.elapsed += 1;
            if self.elapsed >= Self::duration_ticks() {
                self.active = false;
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
