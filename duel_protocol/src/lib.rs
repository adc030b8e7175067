// duel_protocol: wire protocol for the Platform Duel snapshot relay.
//
// Shared by the relay server and game clients (`duel_relay`). It knows
// nothing about sockets beyond `std::io::Read`/`Write`, and nothing about the
// game beyond the shape of a per-frame snapshot.
//
// Module overview:
// - `types.rs`:    `SlotId`, the 0/1 identity the relay assigns per connection.
// - `framing.rs`:  4-ASCII-digit length prefix + payload over any stream,
//                  bounded at 9999 payload bytes.
// - `snapshot.rs`: `PlayerSnapshot` / `BulletSnapshot` JSON schema and the
//                  size-checked encoder.
// - `message.rs`:  Control literals (`start`, `quit`, empty marker, unframed
//                  rejection) and the `ClientFrame` / `PeerFrame` decoders.
//
// Design decisions:
// - **JSON snapshots.** A documented serde schema both ends can decode
//   without sharing a runtime; a full snapshot with a few bullets is a few
//   hundred bytes, far under the frame bound.
// - **Literal control payloads.** Identity, start and quit are bare ASCII so
//   the handshake is readable in a packet capture.
// - **No async runtime.** Blocking `Read`/`Write`, matching the strictly
//   request/response exchange.

pub mod framing;
pub mod message;
pub mod snapshot;
pub mod types;

pub use framing::{FrameError, MAX_PAYLOAD_LEN, read_message, write_message, write_raw};
pub use message::{ClientFrame, EMPTY_SNAPSHOT, PeerFrame, QUIT, REJECTION, START};
pub use snapshot::{BULLET_SIZE, BulletSnapshot, PlayerSnapshot, Point, Rect, SnapshotError};
pub use types::{IdentityError, SLOT_COUNT, SlotId};
