// End-to-end integration tests for the two-player pipeline.
//
// Each test starts a real relay server, connects real `DuelClient` instances
// (via `TestGameClient`), and verifies the full path:
// join → start → snapshot → relay → merge into the peer's `MatchView`.
//
// These tests exercise the same code paths as the game (`exchange_frame`,
// `run_match`, `PatrolBot`); the only test-specific code is the lockstep
// driving in `TestGameClient`.

use std::thread;

use duel_protocol::snapshot::Point;
use duel_protocol::types::SlotId;
use duel_relay::bot::{BotConfig, PatrolBot, START_LIVES};
use duel_relay::client::{ClientError, DuelClient};
use duel_relay::exchange::{FrameOutcome, MatchEnd, MatchView, frame_interval, run_match};
use duel_relay::roster::SlotProfile;
use multiplayer_tests::{READ_TIMEOUT, TestGameClient, join_pair, start_test_relay};

/// Frames allowed for a scripted duel to reach its end.
const MAX_DUEL_FRAMES: u32 = 5000;

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

/// Two players join and receive distinct identities in arrival order.
#[test]
fn two_player_handshake() {
    let (handle, addr) = start_test_relay();
    let (first, second) = join_pair(addr);
    assert_eq!(first.slot(), SlotId::FIRST);
    assert_eq!(second.slot(), SlotId::SECOND);
    handle.stop();
}

/// The first frame sees no opponent; after that each side sees the other's
/// last report.
#[test]
fn snapshots_flow_between_clients() {
    let (handle, addr) = start_test_relay();
    let (first, second) = join_pair(addr);
    let mut a = TestGameClient::scripted(first);
    let mut b = TestGameClient::scripted(second);

    assert_eq!(a.step(), FrameOutcome::Continue);
    assert!(a.view.remote().is_none());

    assert_eq!(b.step(), FrameOutcome::Continue);
    let seen_by_b = b.view.remote().expect("B should see A");
    assert_eq!(seen_by_b.position, SlotProfile::for_slot(SlotId::FIRST).spawn);

    a.sim.snapshot.position = Point::new(10, 20);
    a.step();
    assert_eq!(
        a.view.remote().map(|r| r.position),
        Some(SlotProfile::for_slot(SlotId::SECOND).spawn)
    );

    b.step();
    assert_eq!(b.view.remote().map(|r| r.position), Some(Point::new(10, 20)));

    handle.stop();
}

/// A client that decides the match tells the other one, and both keep the
/// first winner they learned.
#[test]
fn winner_is_adopted_by_the_peer() {
    let (handle, addr) = start_test_relay();
    let (first, second) = join_pair(addr);
    let mut a = TestGameClient::scripted(first);
    let mut b = TestGameClient::scripted(second);

    a.step();
    b.step();

    b.sim.snapshot.lives = 0;
    b.sim.winner = Some("Player 1".into());
    b.step();
    assert_eq!(b.view.winner(), Some("Player 1"));

    a.step();
    assert_eq!(a.view.winner(), Some("Player 1"));

    // A later contradicting claim does not replace the recorded winner.
    a.sim.winner = Some("Player 2".into());
    a.step();
    assert_eq!(a.view.winner(), Some("Player 1"));

    handle.stop();
}

/// Quitting ends the match for the peer.
#[test]
fn peer_quit_ends_the_match() {
    let (handle, addr) = start_test_relay();
    let (first, second) = join_pair(addr);
    let mut a = TestGameClient::scripted(first);
    let mut b = TestGameClient::scripted(second);

    a.step();
    b.step();
    a.quit();

    // The quit may land just after B's next snapshot was answered.
    let quit_seen = (0..3).any(|_| b.step() == FrameOutcome::PeerQuit);
    assert!(quit_seen, "B never saw A quit");

    handle.stop();
}

/// A vanished peer freezes in place: the survivor keeps getting its last
/// snapshot.
#[test]
fn dropped_peer_is_frozen() {
    let (handle, addr) = start_test_relay();
    let (first, second) = join_pair(addr);
    let mut a = TestGameClient::scripted(first);
    let mut b = TestGameClient::scripted(second);

    a.sim.snapshot.position = Point::new(321, 100);
    a.step();
    drop(a);

    for _ in 0..5 {
        assert_eq!(b.step(), FrameOutcome::Continue);
        assert_eq!(b.view.remote().map(|r| r.position), Some(Point::new(321, 100)));
    }

    handle.stop();
}

/// A third client is turned away with the relay's rejection text.
#[test]
fn third_client_is_rejected() {
    let (handle, addr) = start_test_relay();
    let (_first, _second) = join_pair(addr);

    match DuelClient::join(addr) {
        Err(ClientError::Rejected(message)) => assert_eq!(message, "Server full"),
        Err(other) => panic!("expected rejection, got {other}"),
        Ok(_) => panic!("third client got a slot"),
    }

    handle.stop();
}

/// A shooting bot against one that holds fire: the target loses every life,
/// declares the shooter the winner, and both clients agree.
#[test]
fn bot_duel_reaches_agreed_winner() {
    let (handle, addr) = start_test_relay();
    let (first, second) = join_pair(addr);
    let mut shooter = TestGameClient::bot(
        first,
        BotConfig {
            fire_every: 10,
            patrol: false,
        },
    );
    let mut target = TestGameClient::bot(
        second,
        BotConfig {
            fire_every: u64::MAX,
            patrol: false,
        },
    );

    let mut frames = 0;
    while !(shooter.view.is_over() && target.view.is_over()) {
        assert!(frames < MAX_DUEL_FRAMES, "duel did not finish");
        assert_eq!(shooter.step(), FrameOutcome::Continue);
        assert_eq!(target.step(), FrameOutcome::Continue);
        frames += 1;
    }

    assert_eq!(shooter.view.winner(), Some("Player 1"));
    assert_eq!(target.view.winner(), Some("Player 1"));
    assert_eq!(target.sim.lives(), 0);
    assert_eq!(shooter.sim.lives(), START_LIVES);

    shooter.quit();
    let quit_seen = (0..3).any(|_| target.step() == FrameOutcome::PeerQuit);
    assert!(quit_seen);

    handle.stop();
}

/// Two bots driven by `run_match` on their own threads, as the `bot` binary
/// runs them. One quits after a fixed number of frames.
#[test]
fn run_match_until_one_side_quits() {
    let (handle, addr) = start_test_relay();

    let play = move |quit_after: Option<u64>| {
        thread::spawn(move || {
            let client = DuelClient::connect(addr)?;
            client.set_read_timeout(Some(READ_TIMEOUT))?;
            let slot = client.slot();
            let mut bot = PatrolBot::new(slot, BotConfig::default());
            let mut view = MatchView::new(slot);
            let end = run_match(client, &mut bot, &mut view, frame_interval(1000), |_, frame| {
                quit_after.is_some_and(|limit| frame >= limit)
            })?;
            Ok::<_, ClientError>((end, bot.lives()))
        })
    };

    let quitter = play(Some(50));
    let stayer = play(None);

    let (quitter_end, quitter_lives) = quitter.join().unwrap().unwrap();
    let (stayer_end, stayer_lives) = stayer.join().unwrap().unwrap();

    assert_eq!(quitter_end, MatchEnd::LocalQuit);
    assert_eq!(stayer_end, MatchEnd::PeerQuit);
    // Fifty frames is too short for a bullet to cross the arena.
    assert_eq!(quitter_lives, START_LIVES);
    assert_eq!(stayer_lives, START_LIVES);

    handle.stop();
}
