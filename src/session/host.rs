//! Host driver: listens, owns the simulation and the score store

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::frontend::{Cue, Frontend, GameplayView, LeaderboardView, Prompt, Scene};
use crate::game::combat::{CombatOutcome, CombatSystem, Contender, LevelEnd, Ledger};
use crate::net::protocol::{self, ControlMsg, LeaderboardPayload};
use crate::net::transport::{accept_peer, listen};
use crate::net::Connection;
use crate::store::{ScoreStore, TOP_TEAMS};
use crate::util::time::Timer;

use super::state::{Phase, Session, Side, Signal};
use super::sync::{countdown, tick_interval, SyncPolicy, TickSync};
use super::{validate_team_name, SessionEnd, SessionError};

/// Bind, wait for the peer and run the session
pub async fn run_host<F, St>(
    config: &Config,
    mut frontend: F,
    store: St,
) -> Result<SessionEnd, SessionError>
where
    F: Frontend,
    St: ScoreStore,
{
    let listener = listen(config.port).await?;
    frontend.render(&Scene::Lobby { port: config.port });
    let conn = accept_peer(&listener).await;
    drop(listener);

    let session = Session::new(Side::Host, config.seed);
    HostDriver::<TcpStream, F, St>::new(conn, session, frontend, store, config)
        .run()
        .await
}

/// Runs every phase of a session on the host side
pub struct HostDriver<S, F, St> {
    conn: Connection<S>,
    session: Session,
    frontend: F,
    store: St,
    sync: TickSync,
    countdown_secs: u32,
}

impl<S, F, St> HostDriver<S, F, St>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: Frontend,
    St: ScoreStore,
{
    pub fn new(conn: Connection<S>, session: Session, frontend: F, store: St, config: &Config) -> Self {
        Self {
            conn,
            session,
            frontend,
            store,
            sync: TickSync::new(SyncPolicy::from_config(config)),
            countdown_secs: config.countdown_secs,
        }
    }

    pub async fn run(mut self) -> Result<SessionEnd, SessionError> {
        info!(session_id = %self.session.id, remote = self.conn.remote(), "Host session starting");
        let result = self.drive().await;
        if let Err(e) = &result {
            warn!(session_id = %self.session.id, error = %e, "Host session failed");
        }
        self.conn.shutdown().await;
        result
    }

    async fn drive(&mut self) -> Result<SessionEnd, SessionError> {
        self.session.apply(Signal::ConnectionEstablished)?;

        let Some(team_name) = self.ask_team_name() else {
            return Ok(SessionEnd::Quit);
        };
        self.send_control(ControlMsg::TeamName(team_name.clone())).await?;
        self.session.apply(Signal::TeamNameExchanged(team_name))?;

        let peer_kind = self.session.assign_roles()?;
        self.send_control(ControlMsg::Role(peer_kind)).await?;

        loop {
            self.render_pregame();
            if self.frontend.prompt(Prompt::StartGame, None).is_none() {
                return Ok(SessionEnd::Quit);
            }
            self.send_control(ControlMsg::Start).await?;
            self.session.apply(Signal::Start)?;

            countdown(&mut self.frontend, self.countdown_secs).await;
            self.session.apply(Signal::CountdownElapsed)?;

            let Some(end) = self.play_level().await? else {
                return Ok(SessionEnd::Quit);
            };
            let level_score = self.session.bank_level_score();
            info!(
                session_id = %self.session.id,
                level = self.session.level_index,
                ?end,
                level_score,
                total = self.session.score,
                "Level over"
            );

            match self.session.apply(Signal::GameplayStopped(end))? {
                Phase::LevelTransition => {
                    self.frontend.play(Cue::LevelCleared);
                    self.send_control(ControlMsg::LevelScore(level_score)).await?;
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

    fn ask_team_name(&mut self) -> Option<String> {
        let mut error: Option<String> = None;
        loop {
            let raw = self.frontend.prompt(Prompt::TeamName, error.as_deref())?;
            match validate_team_name(&raw) {
                Ok(name) => return Some(name),
                Err(e) => error = Some(e.to_string()),
            }
        }
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

    /// Tick until the stop announcement has been exchanged. `None` on quit.
    async fn play_level(&mut self) -> Result<Option<LevelEnd>, SessionError> {
        let mut ticks = tick_interval();
        let timer = Timer::new();
        let mut tick_count: u64 = 0;
        let mut pending_stop: Option<LevelEnd> = None;

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

            if pending_stop.is_none() {
                self.advance_world();
            }

            let outgoing = self.session.local.frame_state().with_world(
                self.session.health.get(),
                self.session.world.enemies.clone(),
                self.session.world.pickups.clone(),
                pending_stop.is_some(),
            );
            if let Some(frame) = self.sync.exchange_as_host(&mut self.conn, &outgoing).await? {
                self.session.remote.apply_frame(&frame);
            }

            if let Some(end) = pending_stop {
                debug!(
                    session_id = %self.session.id,
                    ticks = tick_count,
                    elapsed_ms = timer.elapsed().as_millis() as u64,
                    missed = self.sync.missed(),
                    "Stop exchanged"
                );
                return Ok(Some(end));
            }

            self.resolve();
            pending_stop = self.session.stop_condition();
            self.render_gameplay();
        }
    }

    /// Spawn trials and enemy movement for one tick
    fn advance_world(&mut self) {
        let session = &mut self.session;
        let spawned = session.world.spawn_trials(&mut session.rng);
        session
            .world
            .move_enemies(session.local.position, session.remote.position);
        if spawned.pickup.is_some() {
            self.frontend.play(Cue::PickupSpawned);
        }
    }

    /// Authoritative resolution: the peer's player first, then ours
    fn resolve(&mut self) {
        let session = &mut self.session;
        let pickup_spawns = session.world.level().pickup_spawns;
        let remote_hitbox = session.remote.hitbox();
        let remote_attacking = session.remote.attacking();
        let local_hitbox = session.local.hitbox();
        let local_attacking = session.local.attacking();

        let mut contenders = [
            Contender {
                hitbox: remote_hitbox,
                attacking: remote_attacking,
                awards_charges: false,
                combat: &mut session.remote.combat,
            },
            Contender {
                hitbox: local_hitbox,
                attacking: local_attacking,
                awards_charges: true,
                combat: &mut session.local.combat,
            },
        ];
        let outcomes = CombatSystem::resolve(
            &mut contenders,
            Ledger::Authoritative {
                enemies: &mut session.world.enemies,
                pickups: &mut session.world.pickups,
                health: &mut session.health,
                enemies_killed: &mut session.enemies_killed,
            },
            pickup_spawns,
        );

        if let [remote, local] = outcomes.as_slice() {
            if remote.damaged {
                self.frontend.play(Cue::Damage);
            }
            play_outcome(&mut self.frontend, local);
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
        let score = self.session.score;
        self.send_control(ControlMsg::TotalScore(score)).await?;
        self.frontend
            .play(if victory { Cue::Victory } else { Cue::Defeat });

        let team_name = self.session.team_name.clone().unwrap_or_default();
        if let Err(e) = self.store.record(&team_name, score) {
            warn!(team = %team_name, score, error = %e, "Failed to record score");
        }
        let top_teams = self.store.top(TOP_TEAMS).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read top teams");
            Vec::new()
        });
        let rank = self.store.rank(score).map_err(|e| {
            warn!(error = %e, "Failed to rank score");
        });

        let payload = LeaderboardPayload {
            top_teams,
            team_rank: rank.unwrap_or(0),
        };
        match protocol::encode_leaderboard(&payload) {
            Ok(bytes) => {
                if let Err(e) = self.conn.send(&bytes).await {
                    warn!(error = %e, "Failed to send leaderboard");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode leaderboard"),
        }

        self.frontend.render(&Scene::Leaderboard(LeaderboardView {
            team_name: &team_name,
            score,
            victory,
            top_teams: &payload.top_teams,
            rank: rank.ok(),
        }));
        info!(session_id = %self.session.id, victory, score, "Session finished");
        Ok(SessionEnd::Finished { victory, score })
    }

    async fn send_control(&mut self, msg: ControlMsg) -> Result<(), SessionError> {
        self.conn.send(&msg.encode()).await?;
        Ok(())
    }
}

/// Feedback for the local player's resolution outcome
pub(crate) fn play_outcome<F: Frontend>(frontend: &mut F, outcome: &CombatOutcome) {
    if outcome.picked_up.is_some() {
        frontend.play(Cue::Pickup);
    }
    if outcome.killed {
        frontend.play(Cue::Kill);
    }
    if outcome.damaged {
        frontend.play(Cue::Damage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::HeadlessFrontend;
    use crate::net::ConnectionError;
    use crate::session::peer::PeerDriver;
    use crate::store::MemoryStore;
    use tokio::io::duplex;

    fn config() -> Config {
        Config {
            seed: Some(7),
            ..Config::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_session_between_host_and_peer() {
        let config = config();
        let (a, b) = duplex(64 * 1024);
        let mut store = MemoryStore::new();

        let host = HostDriver::new(
            Connection::new(a, "peer"),
            Session::new(Side::Host, config.seed),
            HeadlessFrontend::new(Some("Night Shift".to_string()), None),
            &mut store,
            &config,
        );
        let peer = PeerDriver::new(
            Connection::new(b, "host"),
            Session::new(Side::Peer, Some(8)),
            HeadlessFrontend::default(),
            &config,
        );

        let (host_end, peer_end) = tokio::join!(host.run(), peer.run());
        let host_end = host_end.unwrap();
        assert!(matches!(host_end, SessionEnd::Finished { .. }));
        assert_eq!(peer_end.unwrap(), host_end);

        let SessionEnd::Finished { score, .. } = host_end else {
            unreachable!()
        };
        let top = store.top(TOP_TEAMS).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].team_name, "Night Shift");
        assert_eq!(top[0].score, score);
        assert_eq!(store.rank(score).unwrap(), 1);
    }

    #[tokio::test]
    async fn pickup_spawns_are_announced() {
        let config = config();
        let (a, _b) = duplex(1024);
        let mut store = MemoryStore::new();
        let mut host = HostDriver::new(
            Connection::new(a, "peer"),
            Session::new(Side::Host, config.seed),
            HeadlessFrontend::default(),
            &mut store,
            &config,
        );

        for _ in 0..20_000 {
            host.advance_world();
        }
        let announced = host
            .frontend
            .cues()
            .iter()
            .filter(|&&cue| cue == Cue::PickupSpawned)
            .count();
        assert!(announced > 0);
        assert_eq!(announced, host.session.world.pickups.len());
    }

    #[tokio::test(start_paused = true)]
    async fn peer_leaving_mid_game_ends_the_session() {
        let config = config();
        let (a, b) = duplex(64 * 1024);
        let mut store = MemoryStore::new();

        let host = HostDriver::new(
            Connection::new(a, "peer"),
            Session::new(Side::Host, config.seed),
            HeadlessFrontend::default(),
            &mut store,
            &config,
        );
        let fake_peer = async move {
            let mut conn = Connection::new(b, "host");
            let name = conn.recv().await.unwrap();
            assert_eq!(&name[..], b"Night Shift");
            let role = conn.recv().await.unwrap();
            assert!(role[..] == *b"s" || role[..] == *b"z");
            assert_eq!(&conn.recv().await.unwrap()[..], b"start");
        };

        let (result, ()) = tokio::join!(host.run(), fake_peer);
        assert!(matches!(
            result,
            Err(SessionError::Connection(ConnectionError::Closed))
        ));
        assert!(store.top(TOP_TEAMS).unwrap().is_empty());
    }
}
