//! Length-prefixed framing shared by the record and command codecs.
//!
//! Remote records are fixed-size allocations; the live payload is a 4-byte
//! little-endian length prefix followed by that many bytes of MessagePack.
//! Bytes past the frame are padding and are never inspected.

use crate::ProtocolError;

/// Size of the length prefix in bytes.
pub(crate) const PREFIX_LEN: usize = 4;

/// Wrap a MessagePack body in a length-prefixed frame.
pub(crate) fn seal(body: Vec<u8>) -> Vec<u8> {
    let mut framed = Vec::with_capacity(PREFIX_LEN + body.len());
    framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
    framed.extend_from_slice(&body);
    framed
}

/// Extract the framed body, validating the length prefix against the buffer.
pub(crate) fn open(buf: &[u8]) -> Result<&[u8], ProtocolError> {
    if buf.len() < PREFIX_LEN {
        return Err(ProtocolError::MalformedState {
            needed: PREFIX_LEN,
            available: buf.len(),
        });
    }
    let declared = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let needed = PREFIX_LEN + declared;
    if needed > buf.len() {
        return Err(ProtocolError::MalformedState {
            needed,
            available: buf.len(),
        });
    }
    Ok(&buf[PREFIX_LEN..needed])
}
