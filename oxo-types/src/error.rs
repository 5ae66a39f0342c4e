//! Error types for the oxo wire protocol.

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol payloads.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The length prefix claims more payload than the buffer holds
    #[error("malformed state: need {needed} bytes, buffer has {available}")]
    MalformedState {
        /// Bytes required by the prefix (including the prefix itself).
        needed: usize,
        /// Bytes actually present in the buffer.
        available: usize,
    },

    /// The top-level record tag is not the expected "Game" tag
    #[error("unexpected record tag: {0}")]
    UnexpectedTag(String),

    /// The phase tag names no known game phase
    #[error("unknown game phase: {0}")]
    UnknownPhase(String),

    /// The payload shape does not match the record layout
    #[error("invalid record data: {0}")]
    InvalidData(String),

    /// MessagePack serialization failed
    #[error("encoding failed: {0}")]
    Encode(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("decoding failed: {0}")]
    Decode(#[source] rmp_serde::decode::Error),
}
