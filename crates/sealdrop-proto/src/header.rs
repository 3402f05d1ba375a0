//! Fixed-width decimal length header.
//!
//! Every frame starts with exactly [`LengthHeader::SIZE`] ASCII bytes holding
//! the payload length in decimal, left-justified and padded with spaces:
//!
//! ```text
//! "392       " + [392 payload bytes]
//! ```
//!
//! There is no delimiter between header and payload; the receiver relies
//! purely on the fixed width.

use crate::errors::{ProtocolError, Result};

/// Parsed or to-be-written frame length header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthHeader {
    payload_len: u64,
}

impl LengthHeader {
    /// Width of the header on the wire, in bytes.
    pub const SIZE: usize = 10;

    /// Largest payload length representable in [`Self::SIZE`] digits.
    pub const MAX_ENCODABLE: u64 = 9_999_999_999;

    /// Header for a payload of `payload_len` bytes.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::HeaderOverflow` if the length needs more than
    ///   [`Self::SIZE`] digits
    pub fn new(payload_len: usize) -> Result<Self> {
        let len = payload_len as u64;
        if len > Self::MAX_ENCODABLE {
            return Err(ProtocolError::HeaderOverflow { len: payload_len, width: Self::SIZE });
        }

        Ok(Self { payload_len: len })
    }

    /// Payload length declared by this header.
    #[must_use]
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Serialize to the left-justified, space-padded wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let text = format!("{:<width$}", self.payload_len, width = Self::SIZE);
        let mut out = [b' '; Self::SIZE];
        out.copy_from_slice(text.as_bytes());
        out
    }

    /// Parse the first [`Self::SIZE`] bytes of `bytes`.
    ///
    /// Surrounding ASCII whitespace is tolerated on either side of the digits;
    /// anything else (signs, letters, embedded spaces, an all-blank header) is
    /// rejected. Trailing bytes beyond the header are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::HeaderTooShort` if fewer than [`Self::SIZE`] bytes
    /// - `ProtocolError::InvalidHeader` if the bytes are not a decimal length
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw = bytes.get(..Self::SIZE).ok_or(ProtocolError::HeaderTooShort {
            expected: Self::SIZE,
            actual: bytes.len(),
        })?;

        let invalid = || ProtocolError::InvalidHeader {
            header: String::from_utf8_lossy(raw).into_owned(),
        };

        let text = std::str::from_utf8(raw).map_err(|_| invalid())?;
        let digits = text.trim_matches(|c: char| c.is_ascii_whitespace());
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        // At most 10 digits, always fits in u64
        let payload_len = digits.parse::<u64>().map_err(|_| invalid())?;

        Ok(Self { payload_len })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encodes_left_justified() {
        assert_eq!(&LengthHeader::new(392).unwrap().to_bytes(), b"392       ");
        assert_eq!(&LengthHeader::new(0).unwrap().to_bytes(), b"0         ");
        assert_eq!(&LengthHeader::new(9_999_999_999).unwrap().to_bytes(), b"9999999999");
    }

    #[test]
    fn rejects_lengths_wider_than_header() {
        let result = LengthHeader::new(10_000_000_000);
        assert!(matches!(result, Err(ProtocolError::HeaderOverflow { width: 10, .. })));
    }

    #[test]
    fn parses_padded_and_unpadded_forms() {
        assert_eq!(LengthHeader::from_bytes(b"392       ").unwrap().payload_len(), 392);
        assert_eq!(LengthHeader::from_bytes(b"       392").unwrap().payload_len(), 392);
        assert_eq!(LengthHeader::from_bytes(b"0000000017").unwrap().payload_len(), 17);
    }

    #[test]
    fn ignores_bytes_after_header() {
        let header = LengthHeader::from_bytes(b"5         hello").unwrap();
        assert_eq!(header.payload_len(), 5);
    }

    #[test]
    fn rejects_malformed_headers() {
        for raw in [
            &b"          "[..],
            b"-5        ",
            b"+5        ",
            b"5 5       ",
            b"abc       ",
            b"0x10      ",
            b"\xff\xfe        ",
        ] {
            assert!(
                matches!(LengthHeader::from_bytes(raw), Err(ProtocolError::InvalidHeader { .. })),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn rejects_short_input() {
        let result = LengthHeader::from_bytes(b"12");
        assert_eq!(result, Err(ProtocolError::HeaderTooShort { expected: 10, actual: 2 }));
    }

    proptest! {
        #[test]
        fn header_round_trip(len in 0u64..=LengthHeader::MAX_ENCODABLE) {
            let header = LengthHeader { payload_len: len };
            let parsed = LengthHeader::from_bytes(&header.to_bytes()).unwrap();
            prop_assert_eq!(parsed.payload_len(), len);
        }
    }
}
