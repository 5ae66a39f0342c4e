//! Outbound command payloads submitted against the game program.

use serde::{Deserialize, Serialize};

use crate::{frame, ProtocolError};

/// A command submitted to the remote game program.
///
/// Commands travel as tagged MessagePack inside the same length-prefixed
/// frame as the record payload. Timestamps are milliseconds since the Unix
/// epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Initialize a freshly allocated record; the signer becomes player X.
    InitGame,
    /// Attach to a waiting record as player O, stamping the join time.
    Join(u64),
    /// Refresh the signer's keep-alive marker; `0` signals abandonment.
    KeepAlive(u64),
    /// Claim the cell at 0-indexed column `x`, row `y`.
    Move(u8, u8),
}

impl Command {
    /// Encode into a framed payload.
    pub fn to_payload(&self) -> Result<Vec<u8>, ProtocolError> {
        let body = rmp_serde::to_vec(self).map_err(ProtocolError::Encode)?;
        Ok(frame::seal(body))
    }

    /// Decode from a framed payload.
    pub fn from_payload(buf: &[u8]) -> Result<Self, ProtocolError> {
        let body = frame::open(buf)?;
        rmp_serde::from_slice(body).map_err(ProtocolError::Decode)
    }
}
