//! Wire protocol between the thin client and an embedded instance.
//!
//! One JSON document per line in each direction. The client sends a
//! [`Request`] and waits for exactly one [`Response`] before the next one.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::schema::CacheDefinition;
use crate::error::{Result, SnapshotError};

/// Upper bound of a single frame.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CacheNames,
    CacheConfiguration { name: String },
    CreateCache { cache: CacheDefinition },
    DestroyCache { name: String },
}

/// Category of a failed request, preserved across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CacheNotFound,
    CacheExists,
    Internal,
}

/// Server response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    CacheNames { names: Vec<String> },
    CacheConfiguration { cache: CacheDefinition },
    Done,
    Error { kind: ErrorKind, message: String },
}

impl Response {
    /// Encode a server-side failure.
    pub fn from_error(err: &SnapshotError) -> Self {
        match err {
            SnapshotError::CacheNotFound(name) => Response::Error {
                kind: ErrorKind::CacheNotFound,
                message: name.clone(),
            },
            SnapshotError::CacheExists(name) => Response::Error {
                kind: ErrorKind::CacheExists,
                message: name.clone(),
            },
            other => Response::Error {
                kind: ErrorKind::Internal,
                message: other.to_string(),
            },
        }
    }
}

impl ErrorKind {
    /// Decode a failure received from the server.
    pub fn into_error(self, message: String) -> SnapshotError {
        match self {
            ErrorKind::CacheNotFound => SnapshotError::CacheNotFound(message),
            ErrorKind::CacheExists => SnapshotError::CacheExists(message),
            ErrorKind::Internal => SnapshotError::Client(message),
        }
    }
}

/// Write one frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');

    writer
        .write_all(&line)
        .await
        .map_err(|e| SnapshotError::Client(format!("failed to send frame: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| SnapshotError::Client(format!("failed to send frame: {}", e)))
}

/// Read one frame. Returns `None` on a clean end of stream.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    read_bounded_frame(reader, MAX_FRAME_LEN).await
}

/// Reads at most `limit` bytes plus the terminator, so an oversized line is
/// rejected before it is buffered in full.
async fn read_bounded_frame<R, T>(reader: &mut R, limit: usize) -> Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(limit as u64 + 1)
        .read_until(b'\n', &mut line)
        .await
        .map_err(|e| SnapshotError::Client(format!("failed to receive frame: {}", e)))?;

    if read == 0 {
        return Ok(None);
    }
    if line.len() > limit && line.last() != Some(&b'\n') {
        return Err(SnapshotError::Client(format!(
            "frame exceeds the {} byte limit",
            limit
        )));
    }

    serde_json::from_slice(&line)
        .map(Some)
        .map_err(|e| SnapshotError::Client(format!("malformed frame: {}", e)))
}
