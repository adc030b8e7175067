// duel_relay: two-player snapshot relay and game client for Platform Duel.
//
// The relay is a thin pairing service: it admits exactly two TCP clients,
// tells each which slot it holds, holds both at a start barrier, then answers
// every snapshot a client sends with the latest snapshot from the other
// client. It never simulates anything; each client owns its own player and
// bullets and treats the opponent as whatever it last reported.
//
// Module overview:
// - `session.rs`:  Two-slot session table: admission, the start barrier,
//                  per-slot latest snapshot, quit and disconnect handling.
//                  The core data structure that `server.rs` drives.
// - `server.rs`:   TCP listener, reader threads (one per active slot), and
//                  the coordinator loop. Uses `std::net` with a
//                  thread-per-reader architecture and an `mpsc` channel to
//                  funnel events into the single-threaded `Session`.
// - `client.rs`:   Blocking client: join, wait for start, exchange, quit.
// - `exchange.rs`: Per-frame exchange loop and the `MatchView` a client
//                  renders from.
// - `roster.rs`:   Spawn point, display name, and sprite set per slot.
// - `bot.rs`:      `PatrolBot`, a headless local simulation used by the `bot`
//                  binary and the integration tests.
//
// Dependencies: `duel_protocol` (framing, messages, snapshot types).
//
// The relay can run as a standalone binary (`main.rs`) or be embedded in a
// test or game process via the library API (`start_relay`).

pub mod bot;
pub mod client;
pub mod exchange;
pub mod roster;
pub mod server;
pub mod session;

pub use client::{ClientError, DuelClient, LobbyClient};
pub use server::{RelayConfig, RelayHandle, start_relay};
