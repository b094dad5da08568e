//! Collision and combat resolution
//!
//! One resolver serves both sides. The host runs it authoritatively: enemies
//! die, pickups vanish and team health drops. The peer runs it in advisory
//! mode against its mirror of the host's lists, which only touches the local
//! player's own combat state and yields feedback; the host's next frame
//! overwrites everything else.

use tracing::debug;

use super::animation::Immunity;
use super::physics::{Point, Rect, PLAYER_SCALE};
use super::world::Enemy;

/// Shared team health at the start of each level
pub const FULL_HEALTH: u8 = 5;
/// Attack charge cap per player
pub const MAX_CHARGES: u8 = 9;
/// Attack charges per player on the first level
pub const INITIAL_CHARGES: u8 = 4;
/// Attack charges per player when entering the next level
pub const NEXT_LEVEL_CHARGES: u8 = INITIAL_CHARGES - 1;

const PLAYER_WIDTH: f32 = 220.0 * PLAYER_SCALE;
const PLAYER_HEIGHT: f32 = 350.0 * PLAYER_SCALE;
/// Extra horizontal reach of the attack frames, on the facing side
const ATTACK_REACH: f32 = 60.0;
const ENEMY_WIDTH: f32 = 80.0;
const ENEMY_HEIGHT: f32 = 60.0;
const PICKUP_WIDTH: f32 = 48.0;
const PICKUP_HEIGHT: f32 = 96.0;

/// Attack charge counter, clamped to `0..=MAX_CHARGES`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackCharges(u8);

impl AttackCharges {
    pub fn new(count: u8) -> Self {
        Self(count.min(MAX_CHARGES))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Use one charge; false when none are left
    pub fn try_spend(&mut self) -> bool {
        if self.0 == 0 {
            return false;
        }
        self.0 -= 1;
        true
    }

    /// Add one charge; false when already full
    pub fn gain(&mut self) -> bool {
        if self.0 >= MAX_CHARGES {
            return false;
        }
        self.0 += 1;
        true
    }
}

impl Default for AttackCharges {
    fn default() -> Self {
        Self(INITIAL_CHARGES)
    }
}

/// Team health, clamped to `0..=FULL_HEALTH`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamHealth(u8);

impl TeamHealth {
    pub fn full() -> Self {
        Self(FULL_HEALTH)
    }

    /// Health as reported over the wire
    pub fn from_reported(value: u8) -> Self {
        Self(value.min(FULL_HEALTH))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn damage(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    pub fn is_depleted(self) -> bool {
        self.0 == 0
    }
}

impl Default for TeamHealth {
    fn default() -> Self {
        Self::full()
    }
}

/// Per-player combat state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CombatState {
    pub charges: AttackCharges,
    /// One kill allowed per attack activation
    pub can_kill: bool,
    pub immunity: Immunity,
}

/// Bounding regions used for overlap tests
pub struct Hitbox;

impl Hitbox {
    pub fn player(position: Point, attacking: bool, looking_left: bool) -> Rect {
        if !attacking {
            return Rect::at(position, PLAYER_WIDTH, PLAYER_HEIGHT);
        }
        let x = if looking_left {
            position.x - ATTACK_REACH
        } else {
            position.x
        };
        Rect::new(x, position.y, PLAYER_WIDTH + ATTACK_REACH, PLAYER_HEIGHT)
    }

    pub fn enemy(enemy: &Enemy) -> Rect {
        Rect::at(enemy.position, ENEMY_WIDTH, ENEMY_HEIGHT)
    }

    pub fn pickup(position: Point) -> Rect {
        Rect::at(position, PICKUP_WIDTH, PICKUP_HEIGHT)
    }
}

/// A player taking part in this tick's resolution
#[derive(Debug)]
pub struct Contender<'a> {
    pub hitbox: Rect,
    /// In the attack animation this tick
    pub attacking: bool,
    /// Whether picking up a pickup adds to `combat.charges` on this side.
    /// Each side owns its own player's charge count.
    pub awards_charges: bool,
    pub combat: &'a mut CombatState,
}

/// What happened to one contender this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatOutcome {
    /// Slot of the pickup collected
    pub picked_up: Option<usize>,
    pub charge_gained: bool,
    pub killed: bool,
    pub damaged: bool,
}

/// The state the resolver works against
#[derive(Debug)]
pub enum Ledger<'a> {
    /// Canonical lists and counters, mutated in place (host)
    Authoritative {
        enemies: &'a mut Vec<Enemy>,
        pickups: &'a mut Vec<usize>,
        health: &'a mut TeamHealth,
        enemies_killed: &'a mut u32,
    },
    /// A read-only mirror; removals happen on a scratch copy (peer)
    Advisory {
        enemies: &'a [Enemy],
        pickups: &'a [usize],
    },
}

/// How a level ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEnd {
    Defeat,
    Cleared,
}

pub struct CombatSystem;

impl CombatSystem {
    /// Resolve pickups then enemies for every contender, in slice order.
    ///
    /// Each contender claims at most its first overlapping pickup and meets
    /// at most its first overlapping enemy. A pickup or enemy taken by an
    /// earlier contender is gone for later ones in the same tick.
    /// Immunity countdowns advance afterwards.
    pub fn resolve(
        contenders: &mut [Contender<'_>],
        ledger: Ledger<'_>,
        pickup_spawns: &[Point],
    ) -> Vec<CombatOutcome> {
        match ledger {
            Ledger::Authoritative {
                enemies,
                pickups,
                health,
                enemies_killed,
            } => Self::resolve_lists(
                contenders,
                enemies,
                pickups,
                pickup_spawns,
                Some((health, enemies_killed)),
            ),
            Ledger::Advisory { enemies, pickups } => {
                let mut enemies = enemies.to_vec();
                let mut pickups = pickups.to_vec();
                Self::resolve_lists(contenders, &mut enemies, &mut pickups, pickup_spawns, None)
            }
        }
    }

    fn resolve_lists(
        contenders: &mut [Contender<'_>],
        enemies: &mut Vec<Enemy>,
        pickups: &mut Vec<usize>,
        pickup_spawns: &[Point],
        mut tally: Option<(&mut TeamHealth, &mut u32)>,
    ) -> Vec<CombatOutcome> {
        let mut outcomes = vec![CombatOutcome::default(); contenders.len()];

        for (contender, outcome) in contenders.iter_mut().zip(outcomes.iter_mut()) {
            let hit = pickups.iter().position(|&slot| {
                pickup_spawns
                    .get(slot)
                    .is_some_and(|&pos| contender.hitbox.overlaps(&Hitbox::pickup(pos)))
            });
            if let Some(idx) = hit {
                outcome.picked_up = Some(pickups.remove(idx));
                if contender.awards_charges {
                    outcome.charge_gained = contender.combat.charges.gain();
                }
            }
        }

        for (contender, outcome) in contenders.iter_mut().zip(outcomes.iter_mut()) {
            let Some(idx) = enemies
                .iter()
                .position(|e| contender.hitbox.overlaps(&Hitbox::enemy(e)))
            else {
                continue;
            };

            if contender.attacking && contender.combat.can_kill {
                contender.combat.can_kill = false;
                enemies.remove(idx);
                outcome.killed = true;
                if let Some((_, killed)) = tally.as_mut() {
                    **killed += 1;
                }
            } else if !contender.attacking && !contender.combat.immunity.is_active() {
                contender.combat.immunity.trigger();
                outcome.damaged = true;
                if let Some((health, _)) = tally.as_mut() {
                    health.damage();
                }
            }
        }

        for contender in contenders.iter_mut() {
            contender.combat.immunity.tick();
        }

        debug!(?outcomes, authoritative = tally.is_some(), "Combat resolved");
        outcomes
    }

    /// Whether gameplay stops this tick, and why
    pub fn level_end(health: TeamHealth, enemies_killed: u32, required: u32) -> Option<LevelEnd> {
        if health.is_depleted() {
            Some(LevelEnd::Defeat)
        } else if enemies_killed >= required {
            Some(LevelEnd::Cleared)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPAWNS: [Point; 3] = [
        Point::new(100.0, 100.0),
        Point::new(800.0, 100.0),
        Point::new(1500.0, 100.0),
    ];

    fn at(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    fn combat(charges: u8) -> CombatState {
        CombatState {
            charges: AttackCharges::new(charges),
            ..Default::default()
        }
    }

    #[test]
    fn enemy_damages_idle_player() {
        let mut state = combat(4);
        let mut enemies = vec![Enemy::spawn_at(at(110.0, 150.0))];
        let mut pickups = Vec::new();
        let mut health = TeamHealth::full();
        let mut killed = 0;

        let mut contenders = [Contender {
            hitbox: Hitbox::player(at(100.0, 100.0), false, false),
            attacking: false,
            awards_charges: true,
            combat: &mut state,
        }];
        let outcomes = CombatSystem::resolve(
            &mut contenders,
            Ledger::Authoritative {
                enemies: &mut enemies,
                pickups: &mut pickups,
                health: &mut health,
                enemies_killed: &mut killed,
            },
            &SPAWNS,
        );

        assert!(outcomes[0].damaged);
        assert_eq!(health.get(), 4);
        assert!(state.immunity.is_active());
        assert_eq!(enemies.len(), 1);
        assert_eq!(killed, 0);
    }

    #[test]
    fn immune_player_takes_no_further_damage() {
        let mut state = combat(4);
        state.immunity.trigger();
        let mut enemies = vec![Enemy::spawn_at(at(110.0, 150.0))];
        let mut health = TeamHealth::full();
        let mut killed = 0;

        for _ in 0..Immunity::duration_ticks() {
            let mut contenders = [Contender {
                hitbox: Hitbox::player(at(100.0, 100.0), false, false),
                attacking: false,
                awards_charges: true,
                combat: &mut state,
            }];
            CombatSystem::resolve(
                &mut contenders,
                Ledger::Authoritative {
                    enemies: &mut enemies,
                    pickups: &mut Vec::new(),
                    health: &mut health,
                    enemies_killed: &mut killed,
                },
                &SPAWNS,
            );
        }
        assert_eq!(health.get(), FULL_HEALTH);
        assert!(!state.immunity.is_active());
    }

    #[test]
    fn full_charges_do_not_overflow() {
        let mut state = combat(MAX_CHARGES);
        let mut pickups = vec![0];
        let mut contenders = [Contender {
            hitbox: Hitbox::player(at(90.0, 90.0), false, false),
            attacking: false,
            awards_charges: true,
            combat: &mut state,
        }];
        let outcomes = CombatSystem::resolve(
            &mut contenders,
            Ledger::Authoritative {
                enemies: &mut Vec::new(),
                pickups: &mut pickups,
                health: &mut TeamHealth::full(),
                enemies_killed: &mut 0,
            },
            &SPAWNS,
        );

        assert_eq!(outcomes[0].picked_up, Some(0));
        assert!(!outcomes[0].charge_gained);
        assert_eq!(state.charges.get(), MAX_CHARGES);
        assert!(pickups.is_empty());
    }

    #[test]
    fn pickup_goes_to_first_contender_only() {
        let mut first = combat(2);
        let mut second = combat(2);
        let mut pickups = vec![1];
        let mut contenders = [
            Contender {
                hitbox: Hitbox::player(at(790.0, 90.0), false, false),
                attacking: false,
                awards_charges: true,
                combat: &mut first,
            },
            Contender {
                hitbox: Hitbox::player(at(800.0, 110.0), false, false),
                attacking: false,
                awards_charges: true,
                combat: &mut second,
            },
        ];
        let outcomes = CombatSystem::resolve(
            &mut contenders,
            Ledger::Authoritative {
                enemies: &mut Vec::new(),
                pickups: &mut pickups,
                health: &mut TeamHealth::full(),
                enemies_killed: &mut 0,
            },
            &SPAWNS,
        );

        assert_eq!(outcomes[0].picked_up, Some(1));
        assert_eq!(outcomes[1].picked_up, None);
        assert_eq!(first.charges.get(), 3);
        assert_eq!(second.charges.get(), 2);
    }

    #[test]
    fn remote_pickup_is_removed_without_awarding_locally() {
        let mut remote = combat(5);
        let mut pickups = vec![0];
        let mut contenders = [Contender {
            hitbox: Hitbox::player(at(100.0, 100.0), false, false),
            attacking: false,
            awards_charges: false,
            combat: &mut remote,
        }];
        let outcomes = CombatSystem::resolve(
            &mut contenders,
            Ledger::Authoritative {
                enemies: &mut Vec::new(),
                pickups: &mut pickups,
                health: &mut TeamHealth::full(),
                enemies_killed: &mut 0,
            },
            &SPAWNS,
        );
        assert_eq!(outcomes[0].picked_up, Some(0));
        assert_eq!(remote.charges.get(), 5);
        assert!(pickups.is_empty());
    }

    #[test]
    fn one_enemy_dies_once_when_both_players_strike() {
        let mut first = combat(4);
        let mut second = combat(4);
        first.can_kill = true;
        second.can_kill = true;
        let mut enemies = vec![Enemy::spawn_at(at(300.0, 300.0))];
        let mut health = TeamHealth::full();
        let mut killed = 0;

        let mut contenders = [
            Contender {
                hitbox: Hitbox::player(at(250.0, 250.0), true, false),
                attacking: true,
                awards_charges: false,
                combat: &mut first,
            },
            Contender {
                hitbox: Hitbox::player(at(260.0, 260.0), true, true),
                attacking: true,
                awards_charges: true,
                combat: &mut second,
            },
        ];
        let outcomes = CombatSystem::resolve(
            &mut contenders,
            Ledger::Authoritative {
                enemies: &mut enemies,
                pickups: &mut Vec::new(),
                health: &mut health,
                enemies_killed: &mut killed,
            },
            &SPAWNS,
        );

        assert!(outcomes[0].killed);
        assert!(!outcomes[1].killed && !outcomes[1].damaged);
        assert_eq!(killed, 1);
        assert!(enemies.is_empty());
        assert!(!first.can_kill);
        assert!(second.can_kill, "second striker keeps its permission");
        assert_eq!(health.get(), FULL_HEALTH);
    }

    #[test]
    fn one_kill_per_attack_and_no_damage_while_attacking() {
        let mut state = combat(4);
        state.can_kill = true;
        let mut enemies = vec![
            Enemy::spawn_at(at(300.0, 300.0)),
            Enemy::spawn_at(at(310.0, 320.0)),
        ];
        let mut health = TeamHealth::full();
        let mut killed = 0;

        for _ in 0..2 {
            let mut contenders = [Contender {
                hitbox: Hitbox::player(at(250.0, 250.0), true, false),
                attacking: true,
                awards_charges: true,
                combat: &mut state,
            }];
            CombatSystem::resolve(
                &mut contenders,
                Ledger::Authoritative {
                    enemies: &mut enemies,
                    pickups: &mut Vec::new(),
                    health: &mut health,
                    enemies_killed: &mut killed,
                },
                &SPAWNS,
            );
        }

        assert_eq!(killed, 1);
        assert_eq!(enemies.len(), 1);
        assert_eq!(health.get(), FULL_HEALTH);
    }

    #[test]
    fn advisory_mode_leaves_mirror_untouched() {
        let mut state = combat(3);
        state.can_kill = true;
        let enemies = vec![Enemy::spawn_at(at(300.0, 300.0))];
        let pickups = vec![0];

        let mut contenders = [Contender {
            hitbox: Rect::new(50.0, 50.0, 400.0, 400.0),
            attacking: true,
            awards_charges: true,
            combat: &mut state,
        }];
        let outcomes = CombatSystem::resolve(
            &mut contenders,
            Ledger::Advisory {
                enemies: &enemies,
                pickups: &pickups,
            },
            &SPAWNS,
        );

        assert!(outcomes[0].killed);
        assert!(outcomes[0].charge_gained);
        assert_eq!(state.charges.get(), 4);
        assert!(!state.can_kill);
        assert_eq!(enemies.len(), 1);
        assert_eq!(pickups, vec![0]);
    }

    #[test]
    fn health_and_charges_stay_clamped() {
        let mut health = TeamHealth::full();
        for _ in 0..20 {
            health.damage();
        }
        assert_eq!(health.get(), 0);
        assert_eq!(TeamHealth::from_reported(200).get(), FULL_HEALTH);

        let mut charges = AttackCharges::new(250);
        assert_eq!(charges.get(), MAX_CHARGES);
        for _ in 0..20 {
            charges.try_spend();
        }
        assert_eq!(charges.get(), 0);
        assert!(!charges.try_spend());
        for _ in 0..20 {
            charges.gain();
        }
        assert_eq!(charges.get(), MAX_CHARGES);
    }

    #[test]
    fn attack_reach_extends_on_facing_side() {
        let origin = at(500.0, 500.0);
        let left = Hitbox::player(origin, true, true);
        let right = Hitbox::player(origin, true, false);
        assert_eq!(left.x, 440.0);
        assert_eq!(right.x, 500.0);
        assert_eq!(left.w, right.w);
    }

    #[test]
    fn level_end_prefers_defeat() {
        let mut health = TeamHealth::full();
        assert_eq!(CombatSystem::level_end(health, 3, 10), None);
        assert_eq!(
            CombatSystem::level_end(health, 10, 10),
            Some(LevelEnd::Cleared)
        );
        for _ in 0..FULL_HEALTH {
            health.damage();
        }
        assert_eq!(CombatSystem::level_end(health, 10, 10), Some(LevelEnd::Defeat));
        assert_eq!(CombatSystem::level_end(health, 0, 10), Some(LevelEnd::Defeat));
    }
}
