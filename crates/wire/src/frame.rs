//! Length-prefixed framing.
//!
//! ```text
//! +------------------+------------------+
//! | length (u64 BE)  | payload          |
//! +------------------+------------------+
//! ```
//!
//! A length of zero is the graceful-close marker, so empty payloads cannot
//! be framed.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted by default (256 MiB).
pub const DEFAULT_MAX_FRAME_LEN: u64 = 256 * 1024 * 1024;

/// Buffer reserved up front for a frame; larger frames grow as bytes arrive.
const INITIAL_READ_CAPACITY: u64 = 64 * 1024;

/// Framing failure. All variants leave the stream unusable.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Underlying stream error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Declared length exceeds the configured maximum
    #[error("frame of {len} bytes exceeds maximum {max}")]
    TooLarge { len: u64, max: u64 },

    /// Stream ended inside a frame
    #[error("stream ended mid-frame")]
    Truncated,

    /// Empty payloads are reserved for the close marker
    #[error("cannot frame an empty payload")]
    EmptyPayload,
}

/// Read one frame.
///
/// Returns `Ok(None)` on the close marker or when the peer closed the
/// stream cleanly between frames. The declared length is not trusted for
/// allocation: memory grows only with bytes actually received.
pub async fn read_frame<R>(reader: &mut R, max_len: u64) -> Result<Option<Vec<u8>>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 8];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(FrameError::Truncated)
            };
        }
        filled += n;
    }

    let len = u64::from_be_bytes(header);
    if len == 0 {
        return Ok(None);
    }
    if len > max_len {
        return Err(FrameError::TooLarge { len, max: max_len });
    }

    let mut payload = Vec::with_capacity(len.min(INITIAL_READ_CAPACITY) as usize);
    let read = (&mut *reader).take(len).read_to_end(&mut payload).await?;
    if (read as u64) < len {
        return Err(FrameError::Truncated);
    }
    Ok(Some(payload))
}

/// Write one frame and flush.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if payload.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    writer.write_u64(payload.len() as u64).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Write the close marker and flush.
pub async fn write_close<W>(writer: &mut W) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u64(0).await?;
    writer.flush().await?;
    Ok(())
}
