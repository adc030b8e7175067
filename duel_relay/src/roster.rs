// Presentation profile per slot.
//
// The relay identity decides where each player spawns, what they are called
// on screen, and which sprite set draws them. None of this goes over the
// wire: both clients derive the same table from the identity alone, so the
// local view of "Player 2" always matches the remote one.

use duel_protocol::snapshot::Point;
use duel_protocol::types::SlotId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotProfile {
    pub display_name: &'static str,
    pub spawn: Point,
    /// Directory holding the `walk_N.png` frames.
    pub sprite_dir: &'static str,
}

const PROFILES: [SlotProfile; 2] = [
    SlotProfile {
        display_name: "Player 1",
        spawn: Point::new(150, 100),
        sprite_dir: "assets/player1",
    },
    SlotProfile {
        display_name: "Player 2",
        spawn: Point::new(1050, 100),
        sprite_dir: "assets/player2",
    },
];

impl SlotProfile {
    pub fn for_slot(slot: SlotId) -> SlotProfile {
        PROFILES[slot.index()]
    }

    /// `(local, remote)` profiles for a client holding `slot`.
    pub fn local_and_remote(slot: SlotId) -> (SlotProfile, SlotProfile) {
        (Self::for_slot(slot), Self::for_slot(slot.peer()))
    }
}
