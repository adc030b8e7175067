// Slot identity for the two-player relay.
//
// The relay hands out exactly two identities, 0 and 1, in accept order.
// `SlotId` is the only way the rest of the workspace names a player: the
// server indexes its two-slot tables with it, bullets carry it as their
// source, and the client picks its presentation profile from it. The wire
// form is the bare decimal digit (`"0"` / `"1"`), see `message.rs`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of player slots a relay process serves.
pub const SLOT_COUNT: usize = 2;

/// Relay-assigned player identity, always 0 or 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlotId(u8);

/// A raw value that is not a valid slot identity.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid slot identity {0:?} (expected \"0\" or \"1\")")]
pub struct IdentityError(pub String);

impl SlotId {
    pub const FIRST: SlotId = SlotId(0);
    pub const SECOND: SlotId = SlotId(1);

    /// Both slots in assignment order.
    pub const ALL: [SlotId; SLOT_COUNT] = [SlotId::FIRST, SlotId::SECOND];

    /// Checked constructor from a table index.
    pub fn from_index(index: usize) -> Option<SlotId> {
        match index {
            0 => Some(SlotId::FIRST),
            1 => Some(SlotId::SECOND),
            _ => None,
        }
    }

    /// Index into the relay's two-slot tables.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The opposing slot.
    pub fn peer(self) -> SlotId {
        SlotId(1 - self.0)
    }
}

impl TryFrom<u8> for SlotId {
    type Error = IdentityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SlotId::from_index(usize::from(value)).ok_or_else(|| IdentityError(value.to_string()))
    }
}

impl From<SlotId> for u8 {
    fn from(slot: SlotId) -> u8 {
        slot.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_is_an_involution() {
        for slot in SlotId::ALL {
            assert_ne!(slot.peer(), slot);
            assert_eq!(slot.peer().peer(), slot);
        }
    }

    #[test]
    fn only_two_indices_are_valid() {
        assert_eq!(SlotId::from_index(0), Some(SlotId::FIRST));
        assert_eq!(SlotId::from_index(1), Some(SlotId::SECOND));
        assert_eq!(SlotId::from_index(2), None);
        assert!(SlotId::try_from(7u8).is_err());
    }

    #[test]
    fn serializes_as_bare_number() {
        assert_eq!(serde_json::to_string(&SlotId::SECOND).unwrap(), "1");
        let back: SlotId = serde_json::from_str("0").unwrap();
        assert_eq!(back, SlotId::FIRST);
        assert!(serde_json::from_str::<SlotId>("2").is_err());
    }
}
