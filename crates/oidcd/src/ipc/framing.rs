// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message framing for the agent socket and the frontend pipes: one JSON
//! object per message, UTF-8, terminated by a single NUL byte.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::AgentError;

/// Maximum frame length before the terminator.
pub const MAX_FRAME_LEN: usize = 256 * 1024;

/// Read one NUL-terminated frame. Returns `None` on a clean EOF before
/// any payload byte.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, AgentError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    // The limit leaves room for the terminator of a maximum-size frame;
    // anything longer fails below without buffering unbounded input.
    let mut limited = reader.take((MAX_FRAME_LEN + 1) as u64);
    let n = limited
        .read_until(0, &mut buf)
        .await
        .map_err(|e| AgentError::NetworkError(format!("read failed: {e}")))?;
    if n == 0 {
        return Ok(None);
    }
    match buf.last() {
        Some(0) => {
            buf.pop();
        }
        _ => {
            return Err(AgentError::BadRequest(if buf.len() > MAX_FRAME_LEN {
                "message too long".to_owned()
            } else {
                "truncated message".to_owned()
            }));
        }
    }
    Ok(Some(buf))
}

/// Write one frame followed by the NUL terminator.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), AgentError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(AgentError::Internal("response exceeds frame limit".to_owned()));
    }
    writer
        .write_all(payload)
        .await
        .map_err(|e| AgentError::NetworkError(format!("write failed: {e}")))?;
    writer
        .write_all(&[0])
        .await
        .map_err(|e| AgentError::NetworkError(format!("write failed: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| AgentError::NetworkError(format!("write failed: {e}")))?;
    Ok(())
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
