// Test-only game clients for multiplayer integration tests.
//
// Wraps the real `DuelClient` (from `duel_relay::client`) and a
// `LocalSimulation` to provide a synchronous, test-friendly API for the full
// pipeline: join → start → snapshot → relay → merge → step.
//
// Two simulations are available: the real `PatrolBot` from the relay crate,
// and `ScriptedPlayer`, which reports a fixed state and whatever outcome a
// test assigns it. Everything else (framing, the exchange step, winner
// adoption) is the same code the game and the `bot` binary run.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::Duration;

use duel_protocol::snapshot::PlayerSnapshot;
use duel_protocol::types::SlotId;
use duel_relay::bot::{BotConfig, MAX_AMMO, PatrolBot, START_LIVES};
use duel_relay::client::DuelClient;
use duel_relay::exchange::{FrameOutcome, LocalSimulation, MatchView, exchange_frame};
use duel_relay::roster::SlotProfile;
use duel_relay::server::{RelayConfig, RelayHandle, start_relay};

/// Upper bound on any single blocking read in a test.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a relay on a random localhost port.
pub fn start_test_relay() -> (RelayHandle, SocketAddr) {
    let config = RelayConfig {
        host: "127.0.0.1".into(),
        port: 0,
    };
    let (handle, addr) = start_relay(config).expect("failed to start relay");
    thread::sleep(Duration::from_millis(50));
    (handle, addr)
}

/// Join two clients and pass the start barrier. Returns them in slot order.
pub fn join_pair(addr: SocketAddr) -> (DuelClient, DuelClient) {
    let first = DuelClient::join(addr).expect("first join failed");
    let second = DuelClient::join(addr).expect("second join failed");
    first.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
    second.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
    let first = first.wait_for_start().expect("first start failed");
    let second = second.wait_for_start().expect("second start failed");
    (first, second)
}

/// A player that stands at its spawn point and does nothing on its own.
#[derive(Clone, Debug)]
pub struct ScriptedPlayer {
    pub snapshot: PlayerSnapshot,
    pub winner: Option<String>,
    pub steps: u64,
}

impl ScriptedPlayer {
    pub fn new(slot: SlotId) -> Self {
        let profile = SlotProfile::for_slot(slot);
        Self {
            snapshot: PlayerSnapshot {
                position: profile.spawn,
                lives: START_LIVES,
                ammo: MAX_AMMO,
                animation_frame: 0.0,
                facing_right: slot == SlotId::FIRST,
                gun_angle: 0.0,
                alive: true,
                respawn_timer: 0,
                can_dash: true,
                bullets: Vec::new(),
                game_over: None,
            },
            winner: None,
            steps: 0,
        }
    }
}

impl LocalSimulation for ScriptedPlayer {
    fn step(&mut self, _view: &MatchView) {
        self.steps += 1;
    }

    fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.clone()
    }

    fn local_winner(&self) -> Option<String> {
        self.winner.clone()
    }
}

/// A test game client: a live connection, a local simulation, and the view
/// the exchange builds up.
pub struct TestGameClient<S> {
    client: Option<DuelClient>,
    pub sim: S,
    pub view: MatchView,
}

impl<S: LocalSimulation> TestGameClient<S> {
    pub fn new(client: DuelClient, sim: S) -> Self {
        let view = MatchView::new(client.slot());
        Self {
            client: Some(client),
            sim,
            view,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.view.local_slot()
    }

    /// One frame: exchange with the relay, then advance the simulation.
    pub fn step(&mut self) -> FrameOutcome {
        let client = self.client.as_mut().expect("client already quit");
        let outcome = exchange_frame(client, &self.sim, &mut self.view).expect("exchange failed");
        if outcome == FrameOutcome::Continue {
            self.sim.step(&self.view);
        }
        outcome
    }

    /// Send `quit` and drop the connection.
    pub fn quit(&mut self) {
        let client = self.client.take().expect("client already quit");
        client.quit().expect("quit failed");
    }
}

impl TestGameClient<ScriptedPlayer> {
    pub fn scripted(client: DuelClient) -> Self {
        let sim = ScriptedPlayer::new(client.slot());
        Self::new(client, sim)
    }
}

impl TestGameClient<PatrolBot> {
    pub fn bot(client: DuelClient, config: BotConfig) -> Self {
        let sim = PatrolBot::new(client.slot(), config);
        Self::new(client, sim)
    }
}
