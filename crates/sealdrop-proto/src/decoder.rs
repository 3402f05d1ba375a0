//! Incremental frame decoder.
//!
//! Stream transports deliver bytes in arbitrary chunks: a single read may hold
//! half a header, or the tail of one frame and the start of the next. The
//! decoder accumulates bytes until a whole frame is available and never drops
//! or reorders anything it has been fed.
//!
//! # Invariants
//!
//! - A payload is returned only once exactly `payload_len` bytes are buffered.
//! - The size limit is checked against the header alone, so an oversized frame
//!   is rejected without buffering its payload.
//! - Capacity grows only with bytes actually fed. A declared length never
//!   reserves memory by itself.
//! - Bytes following a returned frame stay buffered for the next call.

use bytes::{Buf, Bytes, BytesMut};

use crate::{
    errors::{ProtocolError, Result},
    header::LengthHeader,
};

/// Reassembles length-prefixed frames from a byte stream.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    /// Payload length of the frame currently being collected, once its header
    /// has been consumed.
    pending: Option<usize>,
    max_frame_size: usize,
}

impl FrameDecoder {
    /// Decoder that rejects frames with payloads above `max_frame_size`.
    #[must_use]
    pub fn new(max_frame_size: usize) -> Self {
        Self { buffer: BytesMut::new(), pending: None, max_frame_size }
    }

    /// Configured payload size limit.
    #[must_use]
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Bytes of the current (incomplete) frame held by the decoder, header
    /// included.
    #[must_use]
    pub fn buffered(&self) -> usize {
        match self.pending {
            Some(_) => LengthHeader::SIZE + self.buffer.len(),
            None => self.buffer.len(),
        }
    }

    /// Append bytes read from the transport.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Try to extract the next complete payload.
    ///
    /// Returns `Ok(None)` when more bytes are needed.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidHeader` if the header is not a decimal length
    /// - `ProtocolError::FrameTooLarge` if the declared length exceeds the
    ///   configured maximum
    ///
    /// After an error the stream is out of sync and the decoder must not be
    /// used again.
    pub fn decode(&mut self) -> Result<Option<Bytes>> {
        let payload_len = match self.pending {
            Some(len) => len,
            None => {
                if self.buffer.len() < LengthHeader::SIZE {
                    return Ok(None);
                }

                let header = LengthHeader::from_bytes(&self.buffer)?;
                let declared = header.payload_len();
                if declared > self.max_frame_size as u64 {
                    return Err(ProtocolError::FrameTooLarge {
                        size: declared,
                        max: self.max_frame_size,
                    });
                }

                self.buffer.advance(LengthHeader::SIZE);
                // Bounded by max_frame_size, which is a usize
                let len = declared as usize;
                self.pending = Some(len);
                len
            },
        };

        if self.buffer.len() < payload_len {
            return Ok(None);
        }

        self.pending = None;
        Ok(Some(self.buffer.split_to(payload_len).freeze()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;

    fn encoded(payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_frame(payload, &mut buf).unwrap();
        buf
    }

    #[test]
    fn needs_full_header() {
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(b"5    ");
        assert_eq!(decoder.decode().unwrap(), None);
        assert_eq!(decoder.buffered(), 5);
    }

    #[test]
    fn needs_full_payload() {
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(b"5         hel");
        assert_eq!(decoder.decode().unwrap(), None);
        assert_eq!(decoder.buffered(), 13);

        decoder.feed(b"lo");
        assert_eq!(decoder.decode().unwrap().as_deref(), Some(&b"hello"[..]));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn keeps_trailing_bytes_for_next_frame() {
        let mut decoder = FrameDecoder::new(1024);
        let mut stream = encoded(b"first");
        stream.extend_from_slice(&encoded(b"second"));
        decoder.feed(&stream);

        assert_eq!(decoder.decode().unwrap().as_deref(), Some(&b"first"[..]));
        assert_eq!(decoder.decode().unwrap().as_deref(), Some(&b"second"[..]));
        assert_eq!(decoder.decode().unwrap(), None);
    }

    #[test]
    fn empty_payload_decodes_immediately() {
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(b"0         ");
        assert_eq!(decoder.decode().unwrap().as_deref(), Some(&b""[..]));
    }

    #[test]
    fn rejects_oversized_header_before_payload() {
        let mut decoder = FrameDecoder::new(16);
        decoder.feed(b"17        ");
        assert_eq!(decoder.decode(), Err(ProtocolError::FrameTooLarge { size: 17, max: 16 }));
    }

    #[test]
    fn header_alone_does_not_reserve_payload() {
        let mut decoder = FrameDecoder::new(256 * 1024 * 1024);
        decoder.feed(b"268435456 ");
        assert_eq!(decoder.decode().unwrap(), None);
        assert_eq!(decoder.buffered(), LengthHeader::SIZE);
        assert!(decoder.buffer.capacity() < 1024 * 1024);

        decoder.feed(&[0u8; 4096]);
        assert_eq!(decoder.decode().unwrap(), None);
        assert!(decoder.buffer.capacity() < 1024 * 1024);
    }

    #[test]
    fn accepts_frame_at_limit() {
        let mut decoder = FrameDecoder::new(4);
        decoder.feed(&encoded(b"four"));
        assert_eq!(decoder.decode().unwrap().as_deref(), Some(&b"four"[..]));
    }

    #[test]
    fn rejects_garbage_header() {
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(b"GET / HTTP/1.1\r\n");
        assert!(matches!(decoder.decode(), Err(ProtocolError::InvalidHeader { .. })));
    }
}
