// Payload vocabulary of the relay protocol.
//
// The protocol has no message-type tag; a payload's meaning comes from where
// it appears in the session:
//
//   server → client, once:      identity ("0" / "1")
//   server → client, once:      START ("start")
//   client → server, per frame: a JSON `PlayerSnapshot`, or QUIT ("quit")
//   server → client, per frame: the peer's latest snapshot, the empty
//                               marker ("{}") if the peer has not sent one
//                               yet, or a forwarded QUIT
//
// plus the capacity rejection, which is written *unframed* to any connection
// beyond the second. `ClientFrame` and `PeerFrame` decode the two steady-state
// directions so neither side pattern-matches raw bytes.

use crate::snapshot::{PlayerSnapshot, SnapshotError};
use crate::types::{IdentityError, SlotId};

/// Start signal broadcast when both slots are connected.
pub const START: &[u8] = b"start";

/// Session termination marker, valid in both directions.
pub const QUIT: &[u8] = b"quit";

/// Relay response when the opposing slot has not sent a snapshot yet.
pub const EMPTY_SNAPSHOT: &[u8] = b"{}";

/// Unframed rejection written to connections beyond the second.
pub const REJECTION: &[u8] = b"Server full";

/// Wire form of an assigned identity.
pub fn encode_identity(slot: SlotId) -> Vec<u8> {
    slot.to_string().into_bytes()
}

pub fn decode_identity(payload: &[u8]) -> Result<SlotId, IdentityError> {
    match payload {
        b"0" => Ok(SlotId::FIRST),
        b"1" => Ok(SlotId::SECOND),
        _ => Err(IdentityError(String::from_utf8_lossy(payload).into_owned())),
    }
}

/// A frame sent by a client during the active phase.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientFrame {
    Snapshot(Box<PlayerSnapshot>),
    Quit,
}

impl ClientFrame {
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        match self {
            ClientFrame::Snapshot(snapshot) => snapshot.encode(),
            ClientFrame::Quit => Ok(QUIT.to_vec()),
        }
    }

    pub fn decode(payload: &[u8]) -> Result<Self, SnapshotError> {
        if payload == QUIT {
            return Ok(ClientFrame::Quit);
        }
        Ok(ClientFrame::Snapshot(Box::new(PlayerSnapshot::decode(
            payload,
        )?)))
    }
}

/// A frame the relay sends back during the active phase.
#[derive(Clone, Debug, PartialEq)]
pub enum PeerFrame {
    /// The peer has not reported any state yet.
    Empty,
    Snapshot(Box<PlayerSnapshot>),
    /// The peer left the match.
    Quit,
}

impl PeerFrame {
    /// Relay response for an optional stored snapshot.
    pub fn from_latest(latest: Option<&PlayerSnapshot>) -> Self {
        match latest {
            Some(snapshot) => PeerFrame::Snapshot(Box::new(snapshot.clone())),
            None => PeerFrame::Empty,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        match self {
            PeerFrame::Empty => Ok(EMPTY_SNAPSHOT.to_vec()),
            PeerFrame::Snapshot(snapshot) => snapshot.encode(),
            PeerFrame::Quit => Ok(QUIT.to_vec()),
        }
    }

    pub fn decode(payload: &[u8]) -> Result<Self, SnapshotError> {
        if payload == QUIT {
            return Ok(PeerFrame::Quit);
        }
        if payload.trim_ascii() == EMPTY_SNAPSHOT {
            return Ok(PeerFrame::Empty);
        }
        Ok(PeerFrame::Snapshot(Box::new(PlayerSnapshot::decode(
            payload,
        )?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::sample_snapshot;

    #[test]
    fn identity_wire_form() {
        assert_eq!(encode_identity(SlotId::FIRST), b"0");
        assert_eq!(encode_identity(SlotId::SECOND), b"1");
        assert_eq!(decode_identity(b"1").unwrap(), SlotId::SECOND);
    }

    #[test]
    fn identity_rejects_anything_else() {
        for bad in [&b"2"[..], b"01", b"", b"start", b" 0"] {
            assert!(decode_identity(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn quit_marker_is_recognised_in_both_directions() {
        assert_eq!(ClientFrame::decode(QUIT).unwrap(), ClientFrame::Quit);
        assert_eq!(PeerFrame::decode(QUIT).unwrap(), PeerFrame::Quit);
    }

    #[test]
    fn empty_marker_decodes_to_empty() {
        assert_eq!(PeerFrame::decode(b"{}").unwrap(), PeerFrame::Empty);
        assert_eq!(PeerFrame::from_latest(None), PeerFrame::Empty);
        assert_eq!(PeerFrame::Empty.encode().unwrap(), EMPTY_SNAPSHOT);
    }

    #[test]
    fn client_cannot_send_the_empty_marker() {
        assert!(ClientFrame::decode(EMPTY_SNAPSHOT).is_err());
    }

    #[test]
    fn snapshot_frames_roundtrip() {
        let snap = sample_snapshot();
        let bytes = ClientFrame::Snapshot(Box::new(snap.clone()))
            .encode()
            .unwrap();
        let peer = PeerFrame::decode(&bytes).unwrap();
        assert_eq!(peer, PeerFrame::from_latest(Some(&snap)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            PeerFrame::decode(b"not json"),
            Err(SnapshotError::Malformed(_))
        ));
    }
}
