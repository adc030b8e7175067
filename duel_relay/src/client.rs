// TCP client for the snapshot relay.
//
// The handshake is split into two blocking steps so callers (and tests) can
// observe the lobby state in between:
//
//   DuelClient::join(addr)        connect, read the assigned identity
//     → LobbyClient
//   LobbyClient::wait_for_start() block until the relay sends `start`
//     → DuelClient
//
// `DuelClient::connect` does both. Once active, the client is strictly
// request/response: `exchange` writes one snapshot frame and blocks for exactly
// one reply. There is no reader thread and no buffering; network latency is
// paid inline by the caller's frame loop (see `exchange.rs`).
//
// A connection beyond the second receives the relay's unframed rejection.
// Framing reads its first four bytes as a malformed length prefix; the client
// recognises those bytes and reports `ClientError::Rejected` instead of a
// generic protocol error.

use std::io::{BufReader, BufWriter, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use duel_protocol::framing::{FrameError, read_message, write_message};
use duel_protocol::message::{ClientFrame, PeerFrame, REJECTION, START, decode_identity};
use duel_protocol::snapshot::{PlayerSnapshot, SnapshotError};
use duel_protocol::types::{IdentityError, SlotId};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error("rejected by relay: {0}")]
    Rejected(String),
    #[error(transparent)]
    BadIdentity(#[from] IdentityError),
    #[error("unexpected start signal {0:?}")]
    UnexpectedStart(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Connected and identified, waiting for the second player.
pub struct LobbyClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    slot: SlotId,
}

/// An active session: one request/response exchange per frame.
pub struct DuelClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    slot: SlotId,
}

impl DuelClient {
    /// Connect and read the assigned identity.
    pub fn join<A: ToSocketAddrs>(addr: A) -> Result<LobbyClient, ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        stream.set_nodelay(true).ok();
        let reader_stream = stream.try_clone().map_err(ClientError::Connect)?;
        let mut reader = BufReader::new(reader_stream);
        let writer = BufWriter::new(stream);

        let payload = match read_message(&mut reader) {
            Ok(payload) => payload,
            Err(FrameError::BadLength { prefix }) if REJECTION.starts_with(&prefix) => {
                let mut rest = Vec::new();
                let _ = reader.read_to_end(&mut rest);
                let mut message = prefix.to_vec();
                message.extend_from_slice(&rest);
                return Err(ClientError::Rejected(
                    String::from_utf8_lossy(&message).into_owned(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        let slot = decode_identity(&payload)?;
        info!(%slot, "connected to relay");
        Ok(LobbyClient {
            reader,
            writer,
            slot,
        })
    }

    /// Join and wait for the start signal.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<DuelClient, ClientError> {
        Self::join(addr)?.wait_for_start()
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Send one snapshot and block for the relay's answer.
    pub fn exchange(&mut self, snapshot: &PlayerSnapshot) -> Result<PeerFrame, ClientError> {
        write_message(&mut self.writer, &snapshot.encode()?)?;
        let payload = read_message(&mut self.reader)?;
        Ok(PeerFrame::decode(&payload)?)
    }

    /// Tell the relay this player is leaving. Consumes the client.
    pub fn quit(mut self) -> Result<(), ClientError> {
        debug!(slot = %self.slot, "sending quit");
        write_message(&mut self.writer, &ClientFrame::Quit.encode()?)?;
        Ok(())
    }

    /// Bound every blocking read; `None` waits forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), ClientError> {
        self.reader
            .get_ref()
            .set_read_timeout(timeout)
            .map_err(|e| ClientError::Frame(e.into()))
    }
}

impl LobbyClient {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Bound the wait for the start signal; `None` waits forever.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), ClientError> {
        self.reader
            .get_ref()
            .set_read_timeout(timeout)
            .map_err(|e| ClientError::Frame(e.into()))
    }

    /// Block until both players are connected. Anything other than `start`
    /// aborts the session.
    pub fn wait_for_start(mut self) -> Result<DuelClient, ClientError> {
        info!(slot = %self.slot, "waiting for a second player");
        let payload = read_message(&mut self.reader)?;
        if payload != START {
            return Err(ClientError::UnexpectedStart(
                String::from_utf8_lossy(&payload).into_owned(),
            ));
        }
        info!(slot = %self.slot, "both players connected, match starting");
        Ok(DuelClient {
            reader: self.reader,
            writer: self.writer,
            slot: self.slot,
        })
    }
}
