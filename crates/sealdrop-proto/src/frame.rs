//! Frame encoding.
//!
//! A frame is a [`LengthHeader`] followed by exactly that many payload bytes:
//!
//! ```text
//! [header: 10 ASCII bytes] + [payload: header.payload_len() bytes]
//! ```
//!
//! Payloads are opaque here. The session layers decide what they contain
//! (PEM text, a wrapped key or `iv || ciphertext`).

use bytes::BufMut;

use crate::{errors::Result, header::LengthHeader};

/// Append one frame carrying `payload` to `dst`.
///
/// The header and payload are written back to back so a single transport
/// write can carry the whole frame.
///
/// # Errors
///
/// - `ProtocolError::HeaderOverflow` if the payload length needs more than
///   [`LengthHeader::SIZE`] digits
pub fn encode_frame(payload: &[u8], dst: &mut impl BufMut) -> Result<()> {
    let header = LengthHeader::new(payload.len())?;
    dst.put_slice(&header.to_bytes());
    dst.put_slice(payload);
    Ok(())
}

/// Total wire size of a frame carrying `payload_len` bytes.
#[must_use]
pub fn frame_len(payload_len: usize) -> usize {
    LengthHeader::SIZE + payload_len
}
