// Two-slot session state for the relay.
//
// `Session` is the data structure `server.rs` drives. It owns both client
// write halves and the latest snapshot from each slot, and implements the
// whole per-slot lifecycle:
//
//   Identified → WaitingForPeer → Active → { Disconnected | Quit }
//
// All mutation happens on the server's coordinator thread, one event at a
// time, so the two-slot snapshot table needs no locking and every relay
// response reflects every snapshot received before it.
//
// Capacity is fixed for the life of the process: the first two accepted
// connections get slots 0 and 1, every later one gets the unframed rejection,
// even after both players have left. The start barrier opens at most once.
//
// Departure keeps the departed slot's last snapshot. The surviving player
// keeps receiving it on every turn (a frozen opponent) unless the departure
// was an explicit quit, in which case a `quit` frame is forwarded first.
//
// Write errors never escape: a failed write to a slot ends that slot only.
// Every admitted socket carries a write timeout, so a client that stops
// reading costs the coordinator at most `SLOT_WRITE_TIMEOUT` before that slot
// is dropped; the other slot keeps being served.

use std::io::BufWriter;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use duel_protocol::framing::{FrameError, write_message, write_raw};
use duel_protocol::message::{
    ClientFrame, EMPTY_SNAPSHOT, QUIT, REJECTION, START, encode_identity,
};
use duel_protocol::types::{SLOT_COUNT, SlotId};
use tracing::{debug, info, warn};

/// Longest a single write to one client may block the coordinator.
pub const SLOT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of one connection slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Identity sent; transient until the slot is registered for the barrier.
    Identified,
    /// Registered, blocked on the start barrier.
    WaitingForPeer,
    /// Exchanging snapshots.
    Active,
    /// Transport failure, empty frame, or undecodable snapshot.
    Disconnected,
    /// Sent the quit marker.
    Quit,
}

impl SlotState {
    /// Whether the slot still holds a usable socket.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            SlotState::Identified | SlotState::WaitingForPeer | SlotState::Active
        )
    }
}

/// Result of offering a new connection to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Admitted(SlotId),
    Rejected,
}

struct Slot {
    state: SlotState,
    writer: Option<BufWriter<TcpStream>>,
}

/// Relay session for exactly one pair of players.
pub struct Session {
    slots: [Option<Slot>; SLOT_COUNT],
    accepted: usize,
    barrier_released: bool,
    /// Last payload received from each slot, already validated as a snapshot.
    /// Relayed verbatim so the peer sees exactly the bytes that were sent.
    latest: [Option<Vec<u8>>; SLOT_COUNT],
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            slots: [None, None],
            accepted: 0,
            barrier_released: false,
            latest: [None, None],
        }
    }

    /// Offer a freshly accepted connection. Assigns the next free identity and
    /// sends it, or writes the unframed rejection and closes the stream if two
    /// connections were already accepted.
    pub fn admit(&mut self, stream: TcpStream) -> Admission {
        if let Err(e) = stream.set_write_timeout(Some(SLOT_WRITE_TIMEOUT)) {
            warn!("failed to set write timeout: {e}");
        }
        let Some(slot) = SlotId::from_index(self.accepted) else {
            let mut writer = BufWriter::new(stream);
            if let Err(e) = write_raw(&mut writer, REJECTION) {
                debug!("rejection write failed: {e}");
            }
            let _ = writer.get_ref().shutdown(Shutdown::Both);
            info!("server full, rejected connection");
            return Admission::Rejected;
        };
        self.accepted += 1;

        let mut writer = BufWriter::new(stream);
        let state = match write_message(&mut writer, &encode_identity(slot)) {
            Ok(()) => {
                info!(%slot, "player connected");
                SlotState::Identified
            }
            Err(e) => {
                warn!(%slot, "failed to send identity: {e}");
                SlotState::Disconnected
            }
        };
        self.slots[slot.index()] = Some(Slot {
            state,
            writer: state.is_live().then_some(writer),
        });
        if state.is_live() {
            self.set_state(slot, SlotState::WaitingForPeer);
        }
        Admission::Admitted(slot)
    }

    /// True when both slots are registered and the barrier has not opened yet.
    pub fn barrier_ready(&self) -> bool {
        !self.barrier_released
            && SlotId::ALL
                .iter()
                .all(|&slot| self.slot_state(slot) == Some(SlotState::WaitingForPeer))
    }

    /// Open the start barrier: send `start` to both slots and mark them
    /// active. Returns the slots that actually went active (a slot whose
    /// socket died while waiting is dropped here). No-op unless
    /// `barrier_ready()`.
    pub fn release_barrier(&mut self) -> Vec<SlotId> {
        if !self.barrier_ready() {
            return Vec::new();
        }
        self.barrier_released = true;
        info!("both players connected, starting match");

        let mut activated = Vec::new();
        for slot in SlotId::ALL {
            match self.send_to(slot, START) {
                Ok(()) => {
                    self.set_state(slot, SlotState::Active);
                    activated.push(slot);
                }
                Err(e) => {
                    warn!(%slot, "failed to send start: {e}");
                    self.depart(slot, SlotState::Disconnected);
                }
            }
        }
        activated
    }

    /// Handle one frame read from an active slot.
    ///
    /// - empty payload: the slot disconnects;
    /// - `quit`: the slot quits and the marker is forwarded to the peer;
    /// - anything else must decode as a snapshot; it is stored and the sender
    ///   gets the peer's latest snapshot (or the empty marker) in response.
    pub fn handle_frame(&mut self, from: SlotId, payload: Vec<u8>) {
        if self.slot_state(from) != Some(SlotState::Active) {
            debug!(slot = %from, "ignoring frame from inactive slot");
            return;
        }
        if payload.is_empty() {
            info!(slot = %from, "player disconnected");
            self.depart(from, SlotState::Disconnected);
            return;
        }
        match ClientFrame::decode(&payload) {
            Ok(ClientFrame::Quit) => self.handle_quit(from),
            Ok(ClientFrame::Snapshot(_)) => self.relay(from, payload),
            Err(e) => {
                warn!(slot = %from, "error processing data: {e}");
                self.depart(from, SlotState::Disconnected);
            }
        }
    }

    /// The slot's reader hit end-of-stream or a transport/framing error.
    pub fn handle_disconnect(&mut self, from: SlotId) {
        if self.slot_state(from).is_some_and(SlotState::is_live) {
            info!(slot = %from, "player disconnected");
            self.depart(from, SlotState::Disconnected);
        }
    }

    /// Close every live socket. Used when the relay shuts down.
    pub fn close_all(&mut self) {
        for slot in SlotId::ALL {
            if self.slot_state(slot).is_some_and(SlotState::is_live) {
                self.depart(slot, SlotState::Disconnected);
            }
        }
    }

    fn handle_quit(&mut self, from: SlotId) {
        info!(slot = %from, "player quit the game");
        self.depart(from, SlotState::Quit);
        let peer = from.peer();
        if self.slot_state(peer) != Some(SlotState::Active) {
            return;
        }
        if let Err(e) = self.send_to(peer, QUIT) {
            debug!(slot = %peer, "quit forward failed: {e}");
        }
    }

    fn relay(&mut self, from: SlotId, payload: Vec<u8>) {
        self.latest[from.index()] = Some(payload);
        let response = match &self.latest[from.peer().index()] {
            Some(peer_payload) => peer_payload.clone(),
            None => EMPTY_SNAPSHOT.to_vec(),
        };
        if let Err(e) = self.send_to(from, &response) {
            warn!(slot = %from, "relay write failed: {e}");
            self.depart(from, SlotState::Disconnected);
        }
    }

    /// Current lifecycle state of a slot, `None` if never assigned.
    pub fn slot_state(&self, slot: SlotId) -> Option<SlotState> {
        self.slots[slot.index()].as_ref().map(|s| s.state)
    }

    /// The last snapshot payload stored for a slot.
    pub fn latest_payload(&self, slot: SlotId) -> Option<&[u8]> {
        self.latest[slot.index()].as_deref()
    }

    /// Number of connections that were given a slot. Never decreases.
    pub fn accepted_count(&self) -> usize {
        self.accepted
    }

    pub fn is_started(&self) -> bool {
        self.barrier_released
    }

    /// True once neither slot can make further progress.
    pub fn is_finished(&self) -> bool {
        self.barrier_released
            && SlotId::ALL
                .iter()
                .all(|&slot| !self.slot_state(slot).is_some_and(SlotState::is_live))
    }

    fn set_state(&mut self, slot: SlotId, state: SlotState) {
        if let Some(s) = self.slots[slot.index()].as_mut() {
            s.state = state;
        }
    }

    /// Close the slot's socket and record how it ended. The stored snapshot
    /// is kept.
    fn depart(&mut self, slot: SlotId, state: SlotState) {
        if let Some(s) = self.slots[slot.index()].as_mut() {
            s.state = state;
            if let Some(writer) = s.writer.take() {
                let _ = writer.get_ref().shutdown(Shutdown::Both);
            }
        }
    }

    fn send_to(&mut self, slot: SlotId, payload: &[u8]) -> Result<(), FrameError> {
        match self.slots[slot.index()]
            .as_mut()
            .and_then(|s| s.writer.as_mut())
        {
            Some(writer) => write_message(writer, payload),
            None => Err(FrameError::Disconnected),
        }
    }
}
