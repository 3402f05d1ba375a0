//! Client error types.

use std::{path::PathBuf, time::Duration};

use sealdrop_crypto::CryptoError;
use sealdrop_proto::ProtocolError;
use thiserror::Error;

use crate::session::ClientState;

/// Errors that abort a client run.
///
/// The client never retries: every variant ends the run with a non-zero
/// exit status.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Session method called out of order.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ClientState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Could not connect to the server.
    #[error("connection to {addr} failed: {reason}")]
    Connect {
        /// Address dialed
        addr: String,
        /// Underlying error
        reason: String,
    },

    /// Connecting did not finish within the configured timeout.
    #[error("connection to {addr} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Address dialed
        addr: String,
        /// Configured limit
        timeout: Duration,
    },

    /// Framing failed or the server disconnected.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Handshake or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The destination file could not be written.
    #[error("failed to write {}: {reason}", path.display())]
    FileIo {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_display() {
        let err = ClientError::InvalidState { state: ClientState::Connecting, operation: "receive_file" };
        assert_eq!(err.to_string(), "invalid state transition: cannot receive_file from Connecting");

        let err = ClientError::Connect { addr: "host:1".into(), reason: "refused".into() };
        assert_eq!(err.to_string(), "connection to host:1 failed: refused");

        let err = ClientError::from(ProtocolError::ConnectionClosed { buffered: 4 });
        assert_eq!(
            err.to_string(),
            "protocol error: connection closed with 4 bytes of an incomplete frame buffered"
        );
    }
}
