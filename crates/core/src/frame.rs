//! Length-prefixed framing over a stream socket (§4.1).
//!
//! A frame is a big-endian `u32` length followed by that many payload bytes.
//! `write_frame`/`read_frame` are the ordinary consuming read/write pair used
//! once a handler is committed to a message. `read_frame_timeout` is the
//! non-consuming, peek-based variant the daemon's watchdog path needs: it
//! must be able to give up after `t` seconds without losing bytes that
//! genuinely belong to the next frame, which rules out wrapping
//! `tokio::time::timeout` around `read_exact` (a cancelled `read_exact`
//! drops whatever it had already pulled off the socket into its own buffer).

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::error::ProtocolError;

/// Default maximum frame size: 16 MiB, per §4.1. Payloads here are method
/// call arguments/results, not bulk data, so the cap stays modest.
pub const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

const LEN_PREFIX_BYTES: usize = 4;

/// Two consecutive peeks returning the same byte count with essentially no
/// wait between them indicate the peer has half-closed: once a socket hits
/// EOF, `readable()` resolves immediately forever, so genuine "still
/// waiting for more bytes" stalls look different (they block until the next
/// chunk lands).
const STALL_EOF_THRESHOLD: Duration = Duration::from_millis(2);

/// Write one frame: length prefix then payload, looping through partial
/// writes.
pub async fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> Result<(), ProtocolError> {
    if payload.len() > MAX_FRAME_BYTES as usize {
        return Err(ProtocolError::FrameTooLarge {
            size: payload.len() as u32,
            max: MAX_FRAME_BYTES,
        });
    }
    let len_prefix = (payload.len() as u32).to_be_bytes();
    stream.write_all(&len_prefix).await?;
    stream.write_all(payload).await?;
    Ok(())
}

/// Read one frame, consuming exactly the length prefix plus its payload.
/// Premature EOF at any point is a connection error.
pub async fn read_frame(stream: &mut TcpStream) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; LEN_PREFIX_BYTES];
    read_exact_or_closed(stream, &mut len_buf).await?;
    let frame_len = u32::from_be_bytes(len_buf);
    if frame_len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge {
            size: frame_len,
            max: MAX_FRAME_BYTES,
        });
    }
    let mut payload = vec![0u8; frame_len as usize];
    read_exact_or_closed(stream, &mut payload).await?;
    Ok(payload)
}

async fn read_exact_or_closed(stream: &mut TcpStream, buf: &mut [u8]) -> Result<(), ProtocolError> {
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => Err(ProtocolError::Io(e)),
    }
}

/// Wait up to `timeout` for a *complete* frame to be available, without
/// consuming a partial one, then consume and return it. Used by the daemon's
/// idle watchdog path so it can poll a connection for a new message without
/// risking data loss if it decides to give up mid-poll.
pub async fn read_frame_timeout(
    stream: &TcpStream,
    timeout: Duration,
) -> Result<Vec<u8>, ProtocolError> {
    let deadline = Instant::now() + timeout;

    let mut len_buf = [0u8; LEN_PREFIX_BYTES];
    peek_until_available(stream, &mut len_buf, deadline).await?;
    let frame_len = u32::from_be_bytes(len_buf);
    if frame_len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge {
            size: frame_len,
            max: MAX_FRAME_BYTES,
        });
    }

    let total = LEN_PREFIX_BYTES + frame_len as usize;
    let mut full = vec![0u8; total];
    peek_until_available(stream, &mut full, deadline).await?;

    // The full frame is confirmed buffered; consuming it now cannot block.
    let mut consumed = vec![0u8; total];
    stream.try_read(&mut consumed)?;
    Ok(consumed[LEN_PREFIX_BYTES..].to_vec())
}

/// Peek `buf.len()` bytes, blocking (up to `deadline`) until that many are
/// available, without ever consuming them.
async fn peek_until_available(
    stream: &TcpStream,
    buf: &mut [u8],
    deadline: Instant,
) -> Result<(), ProtocolError> {
    let mut last_len: Option<usize> = None;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ProtocolError::Timeout);
        }

        let wait_start = Instant::now();
        tokio::time::timeout(remaining, stream.readable())
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        let wait_elapsed = wait_start.elapsed();

        match stream.peek(buf).await {
            Ok(n) if n >= buf.len() => return Ok(()),
            Ok(n) => {
                if wait_elapsed < STALL_EOF_THRESHOLD && last_len == Some(n) {
                    return Err(ProtocolError::ConnectionClosed);
                }
                last_len = Some(n);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
