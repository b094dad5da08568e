//! Frontend without a screen
//!
//! Answers prompts from configuration and plays with a simple autopilot:
//! chase the nearest enemy and swing when it is in reach, fetch a pickup
//! when out of charges. Scenes go to the log.

use tracing::{debug, info, trace};

use crate::game::combat::{Hitbox, MAX_CHARGES};
use crate::game::physics::Point;
use crate::game::{Enemy, MoveInput};

use super::{Cue, Frontend, InputState, Prompt, Scene};

const DEFAULT_TEAM_NAME: &str = "Night Shift";
const DEFAULT_HOST_ADDR: &str = "127.0.0.1";
/// Per-axis distance treated as arrived
const DEADZONE: f32 = 6.0;

/// What the autopilot saw in the last rendered frame
#[derive(Debug, Clone, Default)]
struct Observation {
    position: Point,
    charges: u8,
    attacking: bool,
    enemies: Vec<Enemy>,
    pickups: Vec<Point>,
}

#[derive(Debug)]
pub struct HeadlessFrontend {
    team_name: String,
    host_addr: String,
    seen: Option<Observation>,
    cues: Vec<Cue>,
}

impl HeadlessFrontend {
    pub fn new(team_name: Option<String>, host_addr: Option<String>) -> Self {
        Self {
            team_name: team_name.unwrap_or_else(|| DEFAULT_TEAM_NAME.to_string()),
            host_addr: host_addr.unwrap_or_else(|| DEFAULT_HOST_ADDR.to_string()),
            seen: None,
            cues: Vec::new(),
        }
    }

    pub fn cues_played(&self) -> usize {
        self.cues.len()
    }

    /// Every cue played so far, oldest first
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    fn steer(from: Point, to: Point) -> MoveInput {
        MoveInput {
            left: to.x < from.x - DEADZONE,
            right: to.x > from.x + DEADZONE,
            up: to.y < from.y - DEADZONE,
            down: to.y > from.y + DEADZONE,
            attack: false,
        }
    }

    fn nearest(from: Point, points: impl Iterator<Item = Point>) -> Option<Point> {
        points.min_by(|a, b| from.distance(*a).total_cmp(&from.distance(*b)))
    }

    fn autopilot(seen: &Observation) -> MoveInput {
        if seen.attacking {
            return MoveInput::default();
        }

        if seen.charges > 0 {
            let in_reach = seen.enemies.iter().find(|enemy| {
                let looking_left = enemy.position.x < seen.position.x;
                Hitbox::player(seen.position, true, looking_left).overlaps(&Hitbox::enemy(enemy))
            });
            if let Some(enemy) = in_reach {
                let mut input = Self::steer(seen.position, enemy.position);
                input.attack = true;
                return input;
            }
        }

        let target = if seen.charges == 0 || (seen.enemies.is_empty() && seen.charges < MAX_CHARGES)
        {
            Self::nearest(seen.position, seen.pickups.iter().copied())
        } else {
            Self::nearest(seen.position, seen.enemies.iter().map(|e| e.position))
        };

        match target {
            Some(target) => Self::steer(seen.position, target),
            None => MoveInput::default(),
        }
    }
}

impl Default for HeadlessFrontend {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl Frontend for HeadlessFrontend {
    fn poll_input(&mut self) -> InputState {
        InputState {
            movement: self.seen.as_ref().map(Self::autopilot).unwrap_or_default(),
            quit: false,
        }
    }

    fn prompt(&mut self, prompt: Prompt, error: Option<&str>) -> Option<String> {
        if let Some(error) = error {
            // A configured answer will not get any better on retry
            info!(?prompt, error, "Headless answer rejected, giving up");
            return None;
        }
        let answer = match prompt {
            Prompt::TeamName => self.team_name.clone(),
            Prompt::HostAddress => self.host_addr.clone(),
            Prompt::StartGame => String::new(),
        };
        debug!(?prompt, answer = %answer, "Answering prompt");
        Some(answer)
    }

    fn render(&mut self, scene: &Scene<'_>) {
        match scene {
            Scene::Gameplay(view) => {
                let pickups = view
                    .world
                    .pickups
                    .iter()
                    .filter_map(|&slot| view.world.pickup_position(slot))
                    .collect();
                self.seen = Some(Observation {
                    position: view.local.position,
                    charges: view.local.combat.charges.get(),
                    attacking: view.local.attacking(),
                    enemies: view.world.enemies.clone(),
                    pickups,
                });
                trace!(
                    health = view.health,
                    enemies = view.world.enemies.len(),
                    pickups = view.world.pickups.len(),
                    "Gameplay frame"
                );
            }
            Scene::Leaderboard(board) => {
                self.seen = None;
                info!(
                    team = board.team_name,
                    score = board.score,
                    victory = board.victory,
                    rank = ?board.rank,
                    top = ?board.top_teams,
                    "Leaderboard"
                );
            }
            other => {
                self.seen = None;
                debug!(scene = ?other, "Scene");
            }
        }
    }

    fn play(&mut self, cue: Cue) {
        self.cues.push(cue);
        trace!(?cue, "Cue");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(position: Point, charges: u8) -> Observation {
        Observation {
            position,
            charges,
            ..Default::default()
        }
    }

    #[test]
    fn swings_at_enemy_in_reach() {
        let mut obs = seen(Point::new(500.0, 500.0), 2);
        obs.enemies.push(Enemy::spawn_at(Point::new(450.0, 600.0)));
        let input = HeadlessFrontend::autopilot(&obs);
        assert!(input.attack);
        assert!(input.left);
    }

    #[test]
    fn walks_to_pickup_without_charges() {
        let mut obs = seen(Point::new(500.0, 500.0), 0);
        obs.enemies.push(Enemy::spawn_at(Point::new(520.0, 520.0)));
        obs.pickups.push(Point::new(1200.0, 100.0));
        let input = HeadlessFrontend::autopilot(&obs);
        assert!(!input.attack);
        assert!(input.right && input.up);
    }

    #[test]
    fn holds_still_mid_swing() {
        let mut obs = seen(Point::new(500.0, 500.0), 3);
        obs.attacking = true;
        obs.pickups.push(Point::new(0.0, 0.0));
        assert_eq!(HeadlessFrontend::autopilot(&obs), MoveInput::default());
    }

    #[test]
    fn prompts_give_up_after_rejection() {
        let mut frontend = HeadlessFrontend::new(Some("Bones".to_string()), None);
        assert_eq!(
            frontend.prompt(Prompt::TeamName, None).as_deref(),
            Some("Bones")
        );
        assert_eq!(
            frontend.prompt(Prompt::HostAddress, None).as_deref(),
            Some("127.0.0.1")
        );
        assert_eq!(frontend.prompt(Prompt::TeamName, Some("too long")), None);
    }
}
