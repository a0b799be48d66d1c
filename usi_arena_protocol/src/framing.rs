// Length-delimited JSON framing over TCP.
//
// Wire format: a 4-byte big-endian length prefix followed by a JSON payload.
// `write_frame` / `read_frame` move raw bytes; `send` / `recv` add the serde
// step for any message type, which is what both sides actually call.
//
// `MAX_MESSAGE_SIZE` (16 MB) guards against unbounded allocation from a bad
// length prefix. `Display` snapshots carrying an SVG board are the largest
// expected messages.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Maximum allowed frame payload (16 MB).
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame too large: {0} bytes (max {MAX_MESSAGE_SIZE})")]
    TooLarge(usize),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

impl FrameError {
    /// True when the peer closed the stream cleanly.
    pub fn is_eof(&self) -> bool {
        matches!(self, FrameError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Write one frame: 4-byte big-endian length, then payload. Flushes.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let len = payload.len();
    let len_bytes = match u32::try_from(len) {
        Ok(n) if n <= MAX_MESSAGE_SIZE => n.to_be_bytes(),
        _ => return Err(FrameError::TooLarge(len)),
    };
    writer.write_all(&len_bytes)?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame. A stream closed before or during a frame yields an
/// `UnexpectedEof` I/O error.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(FrameError::TooLarge(len as usize));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` to JSON and write it as one frame.
pub fn send<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), FrameError> {
    let json = serde_json::to_vec(msg)?;
    write_frame(writer, &json)
}

/// Read one frame and deserialize it.
pub fn recv<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, FrameError> {
    let bytes = read_frame(reader)?;
    Ok(serde_json::from_slice(&bytes)?)
}
