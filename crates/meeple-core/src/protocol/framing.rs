//! Length-delimited message framing over TCP.
//!
//! Wire format:
//! ```text
//! [payload_len:4][payload:N]
//! ```
//! The length is a big-endian `u32`; the payload is a `bincode` encoding of
//! a [`ClientRequest`](super::ClientRequest) or
//! [`ServerMessage`](super::ServerMessage).
//!
//! [`MAX_FRAME_SIZE`] protects against unbounded allocation from malformed
//! length prefixes.  A `Welcome` carrying a large game is the biggest frame
//! expected in practice.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Maximum accepted payload size (16 MiB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Errors that can occur while framing messages.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream on a frame boundary.
    #[error("connection closed by peer")]
    Closed,
    #[error("frame too large: {len} bytes (max {MAX_FRAME_SIZE})")]
    TooLarge { len: usize },
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed payload: {0}")]
    Codec(#[from] bincode::Error),
}

/// Encodes `msg` into a complete frame (header + payload).
///
/// # Errors
///
/// [`FrameError::Codec`] if serialization fails, [`FrameError::TooLarge`]
/// if the payload exceeds [`MAX_FRAME_SIZE`].
pub fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>, FrameError> {
    let payload = bincode::serialize(msg)?;
    if payload.len() > MAX_FRAME_SIZE as usize {
        return Err(FrameError::TooLarge { len: payload.len() });
    }
    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decodes a frame payload (without its header).
///
/// # Errors
///
/// [`FrameError::Codec`] if the bytes are not a valid encoding of `T`.
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, FrameError> {
    Ok(bincode::deserialize(payload)?)
}

/// Writes one framed message and flushes the stream.
///
/// # Errors
///
/// Any [`FrameError`] from encoding or the underlying writer.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one framed message.
///
/// # Errors
///
/// [`FrameError::Closed`] when the stream ends before a header,
/// [`FrameError::TooLarge`] for an oversized length prefix, otherwise I/O or
/// decoding errors.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    if let Err(e) = reader.read_exact(&mut header).await {
        return Err(if e.kind() == std::io::ErrorKind::UnexpectedEof {
            FrameError::Closed
        } else {
            FrameError::Io(e)
        });
    }

    let len = u32::from_be_bytes(header);
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge { len: len as usize });
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    decode_payload(&payload)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
