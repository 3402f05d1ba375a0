//! Cryptographic error types.

use thiserror::Error;

/// Errors from key handling, key exchange and file encryption.
///
/// Reasons are strings so the error stays `Clone` and never carries key
/// material from the underlying libraries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The wrapped symmetric key could not be recovered.
    ///
    /// Covers wrong ciphertext size, corruption, a mismatched key pair and a
    /// recovered key of the wrong length.
    #[error("key exchange failed: {reason}")]
    Handshake {
        /// What went wrong
        reason: String,
    },

    /// Trailing PKCS#7 padding of a decrypted file is malformed.
    ///
    /// Usually means the wrong symmetric key or a corrupted ciphertext.
    #[error("invalid padding in decrypted file")]
    Padding,

    /// An encrypted blob is structurally invalid.
    #[error("decryption failed: {reason}")]
    Decryption {
        /// What went wrong
        reason: String,
    },

    /// Bytes received as a public key are not a usable RSA public key.
    #[error("invalid public key: {reason}")]
    InvalidPublicKey {
        /// What went wrong
        reason: String,
    },

    /// A key could not be serialized to, or parsed from, PEM.
    #[error("key encoding failed: {reason}")]
    KeyEncoding {
        /// What went wrong
        reason: String,
    },

    /// RSA key generation failed.
    #[error("key generation failed: {reason}")]
    KeyGeneration {
        /// What went wrong
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if the peer sent bad data, as opposed to a local failure.
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            Self::Handshake { .. }
                | Self::Padding
                | Self::Decryption { .. }
                | Self::InvalidPublicKey { .. }
        )
    }
}
