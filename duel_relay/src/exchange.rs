// Per-frame snapshot exchange between the local simulation and the relay.
//
// Each frame runs, strictly in order:
//   1. take the local snapshot (state + bullets this client owns);
//   2. attach the winner, if one is recorded;
//   3. send it as one frame;
//   4. block for exactly one reply, and stop if it is `quit`;
//   5. overwrite the remote player with the reply verbatim.
//
// The local simulation is opaque behind `LocalSimulation`: the exchange only
// asks it for a snapshot and whether it has decided the match. `MatchView` is
// what the simulation (and a renderer) reads back: the remote player's last
// reported state and the recorded winner. There is no prediction or
// interpolation, the remote player is exactly as stale as the last reply.
//
// Winner attribution is first-writer-wins per client: a local decision is
// recorded before sending, so a peer claim arriving in the same frame cannot
// override it, and once recorded it is never replaced.

use std::thread;
use std::time::{Duration, Instant};

use duel_protocol::message::PeerFrame;
use duel_protocol::snapshot::{PlayerSnapshot, Rect};
use duel_protocol::types::SlotId;
use tracing::{debug, info};

use crate::client::{ClientError, DuelClient};

/// Default frame cadence.
pub const DEFAULT_FPS: u32 = 60;

/// The game-specific half of a client.
pub trait LocalSimulation {
    /// Advance the local world one frame, reading the remote player from
    /// `view`.
    fn step(&mut self, view: &MatchView);

    /// The local player's state for this frame, including owned bullets.
    fn snapshot(&self) -> PlayerSnapshot;

    /// Display name of the winner, once the local simulation has ended the
    /// match.
    fn local_winner(&self) -> Option<String>;
}

/// A client's picture of the match: the remote player and the outcome.
#[derive(Clone, Debug)]
pub struct MatchView {
    local: SlotId,
    remote: Option<PlayerSnapshot>,
    winner: Option<String>,
}

impl MatchView {
    pub fn new(local: SlotId) -> Self {
        Self {
            local,
            remote: None,
            winner: None,
        }
    }

    pub fn local_slot(&self) -> SlotId {
        self.local
    }

    /// The remote player's last reported state, `None` until it has sent one.
    pub fn remote(&self) -> Option<&PlayerSnapshot> {
        self.remote.as_ref()
    }

    /// Hitboxes of the remote player's bullets, for local hit detection.
    pub fn remote_bullet_hitboxes(&self) -> Vec<Rect> {
        self.remote
            .iter()
            .flat_map(|r| r.bullets.iter().map(|b| b.hitbox()))
            .collect()
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Record the winner unless one is already recorded. Returns whether this
    /// call set it.
    pub fn record_winner(&mut self, name: impl Into<String>) -> bool {
        if self.winner.is_some() {
            return false;
        }
        let name = name.into();
        info!(winner = %name, "match over");
        self.winner = Some(name);
        true
    }

    /// Replace the remote player with a freshly received snapshot.
    pub fn merge_peer(&mut self, snapshot: PlayerSnapshot) {
        if let Some(name) = &snapshot.game_over {
            self.record_winner(name.clone());
        }
        self.remote = Some(snapshot);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    PeerQuit,
}

/// How a driven match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchEnd {
    /// The opponent sent `quit`.
    PeerQuit,
    /// This client sent `quit`.
    LocalQuit,
}

/// Run one exchange: send the local snapshot, merge the reply.
pub fn exchange_frame<S: LocalSimulation + ?Sized>(
    client: &mut DuelClient,
    sim: &S,
    view: &mut MatchView,
) -> Result<FrameOutcome, ClientError> {
    let mut snapshot = sim.snapshot();
    if let Some(name) = sim.local_winner() {
        view.record_winner(name);
    }
    snapshot.game_over = view.winner().map(str::to_owned);

    match client.exchange(&snapshot)? {
        PeerFrame::Quit => {
            info!("opponent quit");
            Ok(FrameOutcome::PeerQuit)
        }
        PeerFrame::Empty => {
            debug!("opponent has not reported yet");
            Ok(FrameOutcome::Continue)
        }
        PeerFrame::Snapshot(peer) => {
            view.merge_peer(*peer);
            Ok(FrameOutcome::Continue)
        }
    }
}

/// Drive a match at a fixed cadence until either side quits.
///
/// `quit_requested` is consulted at the top of every frame with the current
/// view and frame number; returning true sends `quit` and ends the match.
/// Any network fault ends the match with an error.
pub fn run_match<S, F>(
    mut client: DuelClient,
    sim: &mut S,
    view: &mut MatchView,
    frame_interval: Duration,
    mut quit_requested: F,
) -> Result<MatchEnd, ClientError>
where
    S: LocalSimulation + ?Sized,
    F: FnMut(&MatchView, u64) -> bool,
{
    let mut frame: u64 = 0;
    loop {
        let frame_start = Instant::now();
        if quit_requested(view, frame) {
            client.quit()?;
            return Ok(MatchEnd::LocalQuit);
        }
        if exchange_frame(&mut client, sim, view)? == FrameOutcome::PeerQuit {
            return Ok(MatchEnd::PeerQuit);
        }
        sim.step(view);
        frame += 1;

        if let Some(rest) = frame_interval.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }
}

/// Frame interval for a frames-per-second target.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}
