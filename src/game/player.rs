//! Local player control and the mirrored remote avatar

use crate::net::protocol::FrameState;

use super::animation::{
    ActionFlags, AnimCounters, AnimFrame, AnimKey, Animator, CharacterKind, FrameCounts,
};
use super::combat::{AttackCharges, CombatState, Hitbox};
use super::physics::{ArenaBounds, PhysicsSystem, Point, Rect};

/// Held controls sampled for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub attack: bool,
}

/// The player driven by this process
#[derive(Debug, Clone)]
pub struct PlayerEntity {
    pub kind: CharacterKind,
    pub position: Point,
    pub counters: AnimCounters,
    pub flags: ActionFlags,
    pub combat: CombatState,
    /// Frame selected by the last animation step
    pub frame: AnimFrame,
    counts: FrameCounts,
    bounds: ArenaBounds,
}

impl PlayerEntity {
    pub fn new(kind: CharacterKind, start: Point, looking_left: bool) -> Self {
        Self {
            kind,
            position: start,
            counters: AnimCounters::default(),
            flags: ActionFlags {
                looking_left,
                ..Default::default()
            },
            combat: CombatState::default(),
            frame: AnimFrame {
                key: AnimKey::Idle,
                index: 0,
                flipped: !looking_left,
            },
            counts: FrameCounts::for_kind(kind),
            bounds: ArenaBounds::default(),
        }
    }

    /// Hand movement and attacks to the player (gameplay start)
    pub fn enable_controls(&mut self) {
        self.flags.movement_enabled = true;
        self.flags.attack_enabled = true;
    }

    /// Freeze the player (gameplay stop)
    pub fn disable_controls(&mut self) {
        self.flags.movement_enabled = false;
        self.flags.attack_enabled = false;
    }

    /// Back to the start of a level with a fresh charge count
    pub fn reset_for_level(&mut self, start: Point, charges: u8) {
        self.position = start;
        self.counters = AnimCounters::default();
        self.flags = ActionFlags::default();
        self.combat = CombatState {
            charges: AttackCharges::new(charges),
            ..Default::default()
        };
        self.frame = AnimFrame {
            key: AnimKey::Idle,
            index: 0,
            flipped: true,
        };
    }

    /// Apply this tick's controls. Returns true when an attack was started.
    pub fn apply_input(&mut self, input: &MoveInput) -> bool {
        let mut swung = false;
        if input.attack && self.flags.attack_enabled && self.combat.charges.try_spend() {
            self.flags.movement_enabled = false;
            self.flags.attack_enabled = false;
            self.flags.attacking = true;
            self.flags.walking = false;
            self.combat.can_kill = true;
            swung = true;
        }

        let can_move = self.flags.movement_enabled;
        let pos = self.position;
        let b = self.bounds;

        let go_left = input.left && pos.x > b.min_x && can_move;
        let go_right = !go_left && input.right && pos.x < b.max_x && can_move;
        let go_up = input.up && pos.y > b.min_y && can_move;
        let go_down = !go_up && input.down && pos.y < b.max_y && can_move;

        let horizontal = go_left || go_right;
        let vertical = go_up || go_down;
        if go_left {
            self.flags.looking_left = true;
        } else if go_right {
            self.flags.looking_left = false;
        }

        let speed = if horizontal && vertical {
            PhysicsSystem::diagonal_speed()
        } else {
            PhysicsSystem::straight_speed()
        };
        if go_left {
            self.position.x -= speed;
        } else if go_right {
            self.position.x += speed;
        }
        if go_up {
            self.position.y -= speed;
        } else if go_down {
            self.position.y += speed;
        }

        if horizontal || vertical {
            self.flags.walking = true;
        } else {
            self.counters.walk = 0.0;
            self.flags.walking = false;
        }
        swung
    }

    /// Advance the animation state machine one tick
    pub fn animate(&mut self) -> AnimFrame {
        self.frame = Animator::step(&self.counts, &mut self.counters, &mut self.flags);
        self.frame
    }

    pub fn attacking(&self) -> bool {
        self.flags.attacking
    }

    pub fn hitbox(&self) -> Rect {
        Hitbox::player(self.position, self.flags.attacking, self.flags.looking_left)
    }

    /// This player's half of the per-tick frame message
    pub fn frame_state(&self) -> FrameState {
        FrameState::entity(
            self.frame.key,
            self.frame.index,
            self.frame.flipped,
            self.position,
            self.combat.charges.get(),
        )
    }
}

/// The other side's player, as last reported over the wire
#[derive(Debug, Clone)]
pub struct RemotePlayer {
    pub kind: CharacterKind,
    pub position: Point,
    pub anim_key: AnimKey,
    pub anim_index: u32,
    pub flipped: bool,
    /// Charges mirror the remote's report; kill permission and immunity are
    /// tracked locally by the host
    pub combat: CombatState,
}

impl RemotePlayer {
    pub fn new(kind: CharacterKind, start: Point) -> Self {
        Self {
            kind,
            position: start,
            anim_key: AnimKey::Idle,
            anim_index: 0,
            flipped: false,
            combat: CombatState::default(),
        }
    }

    /// Take the entity fields of a received frame. Entering the attack
    /// animation grants one kill.
    pub fn apply_frame(&mut self, frame: &FrameState) {
        if frame.animation_key == AnimKey::Attack && self.anim_key != AnimKey::Attack {
            self.combat.can_kill = true;
        }
        self.anim_key = frame.animation_key;
        self.anim_index = frame.animation_index;
        self.flipped = frame.flipped;
        self.position = frame.position;
        self.combat.charges = AttackCharges::new(frame.attack_charges);
    }

    pub fn reset_for_level(&mut self, start: Point, charges: u8) {
        *self = Self::new(self.kind, start);
        self.combat.charges = AttackCharges::new(charges);
    }

    pub fn attacking(&self) -> bool {
        self.anim_key == AnimKey::Attack
    }

    pub fn hitbox(&self) -> Rect {
        Hitbox::player(self.position, self.attacking(), !self.flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::MAX_CHARGES;

    fn ready_player() -> PlayerEntity {
        let mut player = PlayerEntity::new(CharacterKind::Skeleton, Point::new(400.0, 500.0), false);
        player.enable_controls();
        player
    }

    #[test]
    fn attack_spends_charge_and_locks_movement() {
        let mut player = ready_player();
        let swung = player.apply_input(&MoveInput {
            attack: true,
            left: true,
            ..Default::default()
        });
        assert!(swung);
        assert_eq!(player.combat.charges.get(), 3);
        assert!(player.combat.can_kill);
        assert!(player.attacking());
        assert_eq!(player.position, Point::new(400.0, 500.0));

        // Holding attack while the swing runs does nothing more
        assert!(!player.apply_input(&MoveInput {
            attack: true,
            ..Default::default()
        }));
        assert_eq!(player.combat.charges.get(), 3);
    }

    #[test]
    fn no_attack_without_charges() {
        let mut player = ready_player();
        player.combat.charges = AttackCharges::new(0);
        assert!(!player.apply_input(&MoveInput {
            attack: true,
            ..Default::default()
        }));
        assert!(!player.attacking());
    }

    #[test]
    fn diagonal_moves_slower_per_axis() {
        let mut player = ready_player();
        player.apply_input(&MoveInput {
            right: true,
            down: true,
            ..Default::default()
        });
        let d = PhysicsSystem::diagonal_speed();
        assert!((player.position.x - (400.0 + d)).abs() < 1e-4);
        assert!((player.position.y - (500.0 + d)).abs() < 1e-4);
        assert!(player.flags.walking);
        assert!(!player.flags.looking_left);
    }

    #[test]
    fn bounds_stop_movement() {
        let mut player = ready_player();
        player.position = Point::new(40.0, 20.0);
        player.apply_input(&MoveInput {
            left: true,
            up: true,
            ..Default::default()
        });
        assert_eq!(player.position, Point::new(40.0, 20.0));
        assert!(!player.flags.walking);
    }

    #[test]
    fn remote_gets_one_kill_per_attack_start() {
        let mut remote = RemotePlayer::new(CharacterKind::Zombie, Point::new(733.0, 800.0));
        let attack = FrameState::entity(AnimKey::Attack, 0, false, Point::new(1.0, 2.0), 3);
        remote.apply_frame(&attack);
        assert!(remote.combat.can_kill);
        remote.combat.can_kill = false;
        remote.apply_frame(&attack);
        assert!(!remote.combat.can_kill, "still the same swing");
        assert_eq!(remote.combat.charges.get(), 3);
        assert!(remote.hitbox().x < 1.0, "facing left while not flipped");
    }

    #[test]
    fn remote_charge_report_is_clamped() {
        let mut remote = RemotePlayer::new(CharacterKind::Zombie, Point::default());
        remote.apply_frame(&FrameState::entity(AnimKey::Idle, 0, true, Point::default(), 200));
        assert_eq!(remote.combat.charges.get(), MAX_CHARGES);
    }

    #[test]
    fn unreadable_frame_leaves_remote_untouched() {
        let mut remote = RemotePlayer::new(CharacterKind::Zombie, Point::new(733.0, 800.0));
        remote.apply_frame(&FrameState::entity(AnimKey::Walk, 4, true, Point::new(10.0, 20.0), 2));

        if let Ok(frame) = crate::net::protocol::decode(b"") {
            remote.apply_frame(&frame);
        }
        assert_eq!(remote.position, Point::new(10.0, 20.0));
        assert_eq!(remote.combat.charges.get(), 2);
    }
}
