//! Peer driver: connects to the host and mirrors its world

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::frontend::{Cue, Frontend, GameplayView, LeaderboardView, Prompt, Scene};
use crate::game::combat::{CombatSystem, Contender, LevelEnd, Ledger, TeamHealth};
use crate::net::protocol::{self, ControlKind, ControlMsg, FrameState};
use crate::net::transport::connect;
use crate::net::{Connection, ConnectionError};
use crate::util::time::Timer;

use super::host::play_outcome;
use super::state::{Phase, Session, Side, Signal};
use super::sync::{countdown, tick_interval, SyncPolicy, TickSync};
use super::{parse_host_addr, SessionEnd, SessionError};

/// Ask for the host address until a connection is made, then run the
/// session. A rejected or unreachable address is reported inline.
pub async fn run_peer<F: Frontend>(
    config: &Config,
    mut frontend: F,
) -> Result<SessionEnd, SessionError> {
    let mut error: Option<String> = None;
    let conn = loop {
        let Some(raw) = frontend.prompt(Prompt::HostAddress, error.as_deref()) else {
            return Ok(SessionEnd::Quit);
        };
        let addr = match parse_host_addr(&raw, config.port) {
            Ok(addr) => addr,
            Err(e) => {
                error = Some(e.to_string());
                continue;
            }
        };
        match connect(addr).await {
            Ok(conn) => break conn,
            Err(e @ ConnectionError::Connect { .. }) => {
                warn!(error = %e, "Connect failed");
                error = Some("Host not found".to_string());
            }
            Err(e) => return Err(e.into()),
        }
    };

    let session = Session::new(Side::Peer, config.seed);
    PeerDriver::<TcpStream, F>::new(conn, session, frontend, config)
        .run()
        .await
}

/// Runs every phase of a session on the peer side
pub struct PeerDriver<S, F> {
    conn: Connection<S>,
    session: Session,
    frontend: F,
    sync: TickSync,
    countdown_secs: u32,
}

impl<S, F> PeerDriver<S, F>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: Frontend,
{
    pub fn new(conn: Connection<S>, session: Session, frontend: F, config: &Config) -> Self {
        Self {
            conn,
            session,
            frontend,
            sync: TickSync::new(SyncPolicy::from_config(config)),
            countdown_secs: config.countdown_secs,
        }
    }

    pub async fn run(mut self) -> Result<SessionEnd, SessionError> {
        info!(session_id = %self.session.id, remote = self.conn.remote(), "Peer session starting");
        let result = self.drive().await;
        if let Err(e) = &result {
            warn!(session_id = %self.session.id, error = %e, "Peer session failed");
        }
        self.conn.shutdown().await;
        result
    }

    async fn drive(&mut self) -> Result<SessionEnd, SessionError> {
        self.session.apply(Signal::ConnectionEstablished)?;
        self.frontend.render(&Scene::AwaitingTeam);

        let ControlMsg::TeamName(team_name) = self.recv_control(ControlKind::TeamName).await? else {
            return Err(unexpected_control());
        };
        self.session.apply(Signal::TeamNameExchanged(team_name))?;

        let ControlMsg::Role(kind) = self.recv_control(ControlKind::Role).await? else {
            return Err(unexpected_control());
        };
        self.session.apply(Signal::RolesAssigned(kind))?;

        loop {
            self.render_pregame();
            self.recv_control(ControlKind::Start).await?;
            self.session.apply(Signal::Start)?;

            countdown(&mut self.frontend, self.countdown_secs).await;
            self.session.apply(Signal::CountdownElapsed)?;

            let Some(end) = self.play_level().await? else {
                return Ok(SessionEnd::Quit);
            };

            match self.session.apply(Signal::GameplayStopped(end))? {
                Phase::LevelTransition => {
                    self.frontend.play(Cue::LevelCleared);
                    let ControlMsg::LevelScore(level_score) =
                        self.recv_control(ControlKind::LevelScore).await?
                    else {
                        return Err(unexpected_control());
                    };
                    self.session.score += level_score;
                    self.frontend.render(&Scene::LevelCleared { level_score });
                    self.session.apply(Signal::LevelScoreExchanged)?;
                }
                Phase::Leaderboard { victory } => {
                    return self.finish(victory).await;
                }
                phase => {
                    return Err(SessionError::InvalidTransition {
                        phase,
                        signal: Signal::GameplayStopped(end),
                    })
                }
            }
        }
    }

    async fn recv_control(&mut self, expected: ControlKind) -> Result<ControlMsg, SessionError> {
        let payload = self.conn.recv().await?;
        Ok(ControlMsg::decode(expected, &payload)?)
    }

    fn render_pregame(&mut self) {
        if let (Some(team_name), Some(local)) =
            (self.session.team_name.as_deref(), self.session.local_kind())
        {
            self.frontend.render(&Scene::PreGame {
                team_name,
                local,
                level_index: self.session.level_index,
            });
        }
    }

    /// Tick until the host announces the stop. `None` on quit.
    async fn play_level(&mut self) -> Result<Option<LevelEnd>, SessionError> {
        let mut ticks = tick_interval();
        let timer = Timer::new();
        let mut tick_count: u64 = 0;

        loop {
            ticks.tick().await;
            tick_count += 1;

            let input = self.frontend.poll_input();
            if input.quit {
                return Ok(None);
            }
            if self.session.local.apply_input(&input.movement) {
                self.frontend.play(Cue::Swing);
            }
            self.session.local.animate();

            let outgoing = self.session.local.frame_state();
            let incoming = self.sync.exchange_as_peer(&mut self.conn, &outgoing).await?;
            if let Some(frame) = incoming {
                if self.mirror(frame) {
                    let end = if self.session.health.is_depleted() {
                        LevelEnd::Defeat
                    } else {
                        LevelEnd::Cleared
                    };
                    debug!(
                        session_id = %self.session.id,
                        ticks = tick_count,
                        elapsed_ms = timer.elapsed().as_millis() as u64,
                        "Host announced stop"
                    );
                    return Ok(Some(end));
                }
            }

            self.resolve_advisory();
            self.render_gameplay();
        }
    }

    /// Take the host's authoritative state. Returns the stop flag; a frame
    /// without world state never stops the level.
    fn mirror(&mut self, frame: FrameState) -> bool {
        self.session.remote.apply_frame(&frame);
        if !frame.is_authoritative() {
            debug!(session_id = %self.session.id, "Frame without world state");
            return false;
        }
        self.session.health = TeamHealth::from_reported(frame.team_health.unwrap_or_default());
        let spawned = self.session.world.mirror(
            frame.enemies.unwrap_or_default(),
            frame.pickups.unwrap_or_default(),
        );
        if spawned {
            self.frontend.play(Cue::PickupSpawned);
        }
        frame.stop
    }

    /// Local feedback only: our own charges, kill permission and immunity
    fn resolve_advisory(&mut self) {
        let session = &mut self.session;
        let hitbox = session.local.hitbox();
        let attacking = session.local.attacking();
        let mut contenders = [Contender {
            hitbox,
            attacking,
            awards_charges: true,
            combat: &mut session.local.combat,
        }];
        let outcomes = CombatSystem::resolve(
            &mut contenders,
            Ledger::Advisory {
                enemies: &session.world.enemies,
                pickups: &session.world.pickups,
            },
            session.world.level().pickup_spawns,
        );
        if let Some(outcome) = outcomes.first() {
            play_outcome(&mut self.frontend, outcome);
        }
    }

    fn render_gameplay(&mut self) {
        let session = &self.session;
        self.frontend.render(&Scene::Gameplay(GameplayView {
            level_index: session.level_index,
            health: session.health.get(),
            local: &session.local,
            remote: &session.remote,
            world: &session.world,
        }));
    }

    async fn finish(&mut self, victory: bool) -> Result<SessionEnd, SessionError> {
        let ControlMsg::TotalScore(score) = self.recv_control(ControlKind::TotalScore).await? else {
            return Err(unexpected_control());
        };
        self.session.score = score;
        self.frontend
            .play(if victory { Cue::Victory } else { Cue::Defeat });

        // Best effort: without the table the screen shows only our score
        let board = match self.conn.recv().await {
            Ok(payload) => protocol::decode_leaderboard(&payload)
                .map_err(|e| warn!(error = %e, "Unreadable leaderboard"))
                .ok(),
            Err(e) => {
                warn!(error = %e, "No leaderboard from host");
                None
            }
        };
        let (top_teams, rank) = match board {
            Some(board) => (board.top_teams, Some(board.team_rank).filter(|&r| r > 0)),
            None => (Vec::new(), None),
        };

        let team_name = self.session.team_name.clone().unwrap_or_default();
        self.frontend.render(&Scene::Leaderboard(LeaderboardView {
            team_name: &team_name,
            score,
            victory,
            top_teams: &top_teams,
            rank,
        }));
        info!(session_id = %self.session.id, victory, score, "Session finished");
        Ok(SessionEnd::Finished { victory, score })
    }
}

fn unexpected_control() -> SessionError {
    SessionError::Protocol(protocol::ProtocolError::Malformed(
        "unexpected control message".to_string(),
    ))
}
