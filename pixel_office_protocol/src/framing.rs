// Length-delimited message framing.
//
// Wire format: a 4-byte big-endian length prefix followed by that many bytes
// of JSON. `write_message` / `read_message` move raw payloads;
// `send_frame` / `recv_frame` add the serde step for typed messages.
//
// `MAX_MESSAGE_SIZE` bounds allocation from a corrupt or hostile length
// prefix. The largest legitimate message is a full room snapshot, a few KB.
//
// A JSON error from `recv_frame` means one bad frame was consumed whole; the
// stream is still aligned and the caller may keep reading. An I/O or size
// error means the stream is unusable.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// 1 MiB.
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame I/O: {0}")]
    Io(#[from] io::Error),

    #[error("frame of {len} bytes exceeds the {MAX_MESSAGE_SIZE} byte limit")]
    TooLarge { len: usize },

    #[error("frame payload is not a valid message: {0}")]
    Json(#[from] serde_json::Error),
}

impl FrameError {
    /// True when the stream is still aligned on a frame boundary.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::Json(_))
    }
}

/// Write one frame: length prefix, then payload.
pub fn write_message<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let len = payload.len();
    let prefix = match u32::try_from(len) {
        Ok(n) if n <= MAX_MESSAGE_SIZE => n,
        _ => return Err(FrameError::TooLarge { len }),
    };
    writer.write_all(&prefix.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame's payload. A clean close before or inside a frame surfaces
/// as `io::ErrorKind::UnexpectedEof`.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(FrameError::TooLarge { len: len as usize });
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` as JSON and write it as one frame.
pub fn send_frame<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), FrameError> {
    let json = serde_json::to_vec(msg)?;
    write_message(writer, &json)
}

/// Read one frame and decode it as `T`.
pub fn recv_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, FrameError> {
    let payload = read_message(reader)?;
    Ok(serde_json::from_slice(&payload)?)
}
