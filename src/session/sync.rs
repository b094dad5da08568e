//! Per-tick frame exchange
//!
//! Host sends then receives, peer receives then sends; one frame each way
//! per tick. Without a timeout a silent remote stalls the tick. With one, a
//! late frame is a dropped tick: the last remote state is kept and play goes
//! on until too many ticks in a row are dropped.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::Config;
use crate::frontend::{Cue, Frontend, Scene};
use crate::net::protocol::{self, FrameState};
use crate::net::{Connection, ConnectionError};
use crate::util::time::tick_duration;

/// How long to wait for the remote each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Consecutive dropped ticks before giving up
    pub max_missed_ticks: u32,
}

impl SyncPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.sync_timeout,
            max_missed_ticks: config.max_missed_ticks,
        }
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            timeout: None,
            max_missed_ticks: 300,
        }
    }
}

/// Exchange state carried across ticks
#[derive(Debug)]
pub struct TickSync {
    policy: SyncPolicy,
    missed: u32,
}

impl TickSync {
    pub fn new(policy: SyncPolicy) -> Self {
        Self { policy, missed: 0 }
    }

    /// Consecutive ticks without a remote frame
    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// Host order: send, then receive
    pub async fn exchange_as_host<S>(
        &mut self,
        conn: &mut Connection<S>,
        outgoing: &FrameState,
    ) -> Result<Option<FrameState>, ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Self::send(conn, outgoing).await?;
        self.receive(conn).await
    }

    /// Peer order: receive, then send
    pub async fn exchange_as_peer<S>(
        &mut self,
        conn: &mut Connection<S>,
        outgoing: &FrameState,
    ) -> Result<Option<FrameState>, ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let incoming = self.receive(conn).await?;
        Self::send(conn, outgoing).await?;
        Ok(incoming)
    }

    /// A failed send loses this tick's frame; only a closed stream is fatal
    async fn send<S>(conn: &mut Connection<S>, frame: &FrameState) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let payload = match protocol::encode(frame) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to encode frame");
                return Ok(());
            }
        };
        match conn.send(&payload).await {
            Ok(()) => Ok(()),
            Err(ConnectionError::Closed) => Err(ConnectionError::Closed),
            Err(e) => {
                warn!(remote = conn.remote(), error = %e, "Failed to send frame");
                Ok(())
            }
        }
    }

    /// `Ok(None)` when nothing usable arrived this tick
    async fn receive<S>(
        &mut self,
        conn: &mut Connection<S>,
    ) -> Result<Option<FrameState>, ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let Some(payload) = conn.recv_timeout(self.policy.timeout).await? else {
            self.missed += 1;
            debug!(missed = self.missed, "Tick dropped, no frame from remote");
            if self.missed >= self.policy.max_missed_ticks {
                return Err(ConnectionError::Stalled(self.missed));
            }
            return Ok(None);
        };
        self.missed = 0;

        match protocol::decode(&payload) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                warn!(remote = conn.remote(), error = %e, "Skipping frame");
                Ok(None)
            }
        }
    }
}

/// The 60 Hz gameplay clock. Late ticks are skipped, not bunched up.
pub fn tick_interval() -> Interval {
    let mut ticks = interval(tick_duration());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticks
}

/// Blocking pre-gameplay countdown with a beat each second. Input is not
/// read while it runs.
pub async fn countdown<F: Frontend>(frontend: &mut F, secs: u32) {
    for remaining in (1..=secs).rev() {
        frontend.render(&Scene::Countdown { remaining });
        frontend.play(Cue::CountdownBeat);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
