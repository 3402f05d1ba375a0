//! Server error types.

use std::path::PathBuf;

use sealdrop_crypto::CryptoError;
use sealdrop_proto::ProtocolError;
use thiserror::Error;

use crate::{key_store::KeyStorageError, session::SessionState};

/// Errors that can occur in the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Session method called out of order.
    ///
    /// Logic bug in the caller. Fatal for that session.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: SessionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Key pair could not be loaded or created.
    ///
    /// Fatal at startup. Fix the key directory and restart.
    #[error(transparent)]
    KeyStorage(#[from] KeyStorageError),

    /// The file to serve could not be read.
    ///
    /// Fatal for that session only; the file is re-read for the next one.
    #[error("failed to read {}: {reason}", path.display())]
    FileIo {
        /// File being served
        path: PathBuf,
        /// Underlying I/O error
        reason: String,
    },

    /// Framing failed or the peer disconnected.
    ///
    /// Fatal for that session, the server keeps accepting.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Handshake or encryption failed.
    ///
    /// Usually a misbehaving client. Fatal for that session.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Invalid configuration (bad bind address, unusable settings).
    ///
    /// Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Listener failure (bind, accept, local address).
    #[error("transport error: {0}")]
    Transport(String),

    /// Background startup task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl ServerError {
    /// Returns true if the error ends only the current session.
    ///
    /// Startup errors (configuration, key storage, binding) are not
    /// session-scoped and stop the server.
    pub fn is_session_scoped(&self) -> bool {
        matches!(
            self,
            Self::InvalidState { .. } | Self::FileIo { .. } | Self::Protocol(_) | Self::Crypto(_)
        )
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display() {
        let err = ServerError::InvalidState { state: SessionState::Listening, operation: "send_file" };
        assert_eq!(err.to_string(), "invalid state transition: cannot send_file from Listening");

        let err = ServerError::FileIo { path: PathBuf::from("data.txt"), reason: "not found".into() };
        assert_eq!(err.to_string(), "failed to read data.txt: not found");

        let err = ServerError::from(CryptoError::Padding);
        assert_eq!(err.to_string(), "crypto error: invalid padding in decrypted file");
    }

    #[test]
    fn session_errors_are_scoped() {
        assert!(ServerError::from(ProtocolError::ConnectionClosed { buffered: 0 }).is_session_scoped());
        assert!(ServerError::from(CryptoError::Handshake { reason: "x".into() }).is_session_scoped());
        assert!(!ServerError::Config("bad".into()).is_session_scoped());
        assert!(!ServerError::Transport("bind".into()).is_session_scoped());
        assert!(!ServerError::Task("panicked".into()).is_session_scoped());
    }
}
