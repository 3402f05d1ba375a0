//! Error types for the framing layer.
//!
//! Transport failures are carried as strings so the error stays `Clone` and
//! comparable in tests, the same trade-off the session layers make.

use std::{io, time::Duration};

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while framing or unframing payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Declared (or outgoing) payload length exceeds the configured bound.
    ///
    /// Raised from the header alone, before payload bytes are accumulated.
    #[error("frame too large: {size} bytes exceeds maximum of {max}")]
    FrameTooLarge {
        /// Length declared by the header or requested by the sender
        size: u64,
        /// Configured maximum
        max: usize,
    },

    /// Peer closed the stream before a complete frame arrived.
    #[error("connection closed with {buffered} bytes of an incomplete frame buffered")]
    ConnectionClosed {
        /// Bytes of the partial frame that were received before EOF
        buffered: usize,
    },

    /// The fixed-width length header is not a space-padded decimal number.
    #[error("invalid length header: {header:?}")]
    InvalidHeader {
        /// Header bytes, lossily decoded for diagnostics
        header: String,
    },

    /// Fewer bytes than a full header were supplied to the parser.
    #[error("length header too short: expected {expected} bytes, got {actual}")]
    HeaderTooShort {
        /// Header width
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Payload length has more decimal digits than the header can hold.
    #[error("payload of {len} bytes does not fit a {width}-digit length header")]
    HeaderOverflow {
        /// Payload length
        len: usize,
        /// Header width in digits
        width: usize,
    },

    /// A read or write did not complete within the configured I/O timeout.
    #[error("i/o timed out after {0:?}")]
    Timeout(Duration),

    /// Underlying transport error.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProtocolError {
    /// Returns true if the peer went away rather than violating the protocol.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::ConnectionClosed { .. } | Self::Transport(_))
    }
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
