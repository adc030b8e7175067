// Length-prefixed message framing over TCP.
//
// Every frame on the wire is a 4-byte ASCII decimal length, zero-padded,
// followed by exactly that many payload bytes: `0005start`. The prefix width
// caps a payload at `MAX_PAYLOAD_LEN` (9999) bytes, so the snapshot encoder
// in `snapshot.rs` checks its output against the same bound before anything
// reaches this module. Oversized writes are refused, never truncated.
//
// `write_message` / `read_message` operate on raw bytes; payload meaning
// (identity, control literals, JSON snapshots) lives in `message.rs`.
//
// A non-digit prefix is a protocol error. The offending four bytes are kept
// in `FrameError::BadLength` because the relay's capacity rejection is sent
// unframed, and the client recognises it from exactly those bytes.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Width of the ASCII length prefix.
pub const PREFIX_LEN: usize = 4;

/// Largest payload a 4-digit prefix can describe.
pub const MAX_PAYLOAD_LEN: usize = 9999;

/// Framing failures. `Disconnected` and `BadLength` are the two cases the
/// relay and client distinguish; everything else is an opaque transport error.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream before a complete frame arrived.
    #[error("peer disconnected")]
    Disconnected,
    /// The length prefix was not four ASCII digits.
    #[error("malformed length prefix {prefix:?}")]
    BadLength { prefix: [u8; PREFIX_LEN] },
    /// The payload does not fit in a 4-digit length prefix.
    #[error("payload too large: {len} bytes (max {MAX_PAYLOAD_LEN})")]
    TooLarge { len: usize },
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// True for errors that mean the connection is gone rather than confused.
    pub fn is_disconnect(&self) -> bool {
        match self {
            FrameError::Disconnected => true,
            FrameError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
            ),
            FrameError::BadLength { .. } | FrameError::TooLarge { .. } => false,
        }
    }
}

/// Encode a payload into a complete frame (prefix + payload).
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let len = payload.len();
    if len > MAX_PAYLOAD_LEN {
        return Err(FrameError::TooLarge { len });
    }
    let mut frame = Vec::with_capacity(PREFIX_LEN + len);
    frame.extend_from_slice(format!("{len:04}").as_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Write one frame as a single `write_all`, then flush.
pub fn write_message<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Write bytes with no length prefix. Only the capacity rejection uses this.
pub fn write_raw<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), FrameError> {
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame and return its payload.
///
/// Returns `Disconnected` if the stream ends before or inside a frame and
/// `BadLength` if the prefix is not four ASCII digits.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut prefix = [0u8; PREFIX_LEN];
    read_exact_or_disconnect(reader, &mut prefix)?;
    let len = parse_prefix(&prefix).ok_or(FrameError::BadLength { prefix })?;
    let mut payload = vec![0u8; len];
    read_exact_or_disconnect(reader, &mut payload)?;
    Ok(payload)
}

fn parse_prefix(prefix: &[u8; PREFIX_LEN]) -> Option<usize> {
    let mut len = 0usize;
    for &b in prefix {
        if !b.is_ascii_digit() {
            return None;
        }
        len = len * 10 + usize::from(b - b'0');
    }
    Some(len)
}

fn read_exact_or_disconnect<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), FrameError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FrameError::Disconnected,
        _ => FrameError::Io(e),
    })
}
