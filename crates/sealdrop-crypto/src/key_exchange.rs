//! Symmetric key transport under RSA-OAEP (SHA-256).
//!
//! ```text
//! Server                                  Client
//!   publish_public_key(pair) ──PEM──▶       negotiate(rng, pem)
//!                                             ├─ SymmetricKey::generate
//!   unwrap_symmetric_key(sk, ct) ◀──ct──      └─ wrap_symmetric_key
//! ```
//!
//! Randomness is supplied by the caller, so handshakes are reproducible in
//! tests with a seeded RNG.

use rand::{CryptoRng, RngCore};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{
    error::CryptoError,
    keys::{AsymmetricKeyPair, SYMMETRIC_KEY_SIZE, SymmetricKey, parse_public_key_pem},
};

/// Serialize the server's public key for the first frame of a session.
///
/// # Errors
///
/// - `CryptoError::KeyEncoding` if the key cannot be PEM-encoded
pub fn publish_public_key(pair: &AsymmetricKeyPair) -> Result<Vec<u8>, CryptoError> {
    pair.public_key_pem().map(String::into_bytes)
}

/// Client side of the handshake.
///
/// Parses the server's public key, draws a fresh [`SymmetricKey`] and wraps
/// it. Returns the key (kept by the client) and the ciphertext (sent to the
/// server as the second frame).
///
/// # Errors
///
/// - `CryptoError::InvalidPublicKey` if the bytes are not a PEM public key
/// - `CryptoError::Handshake` if the key cannot be wrapped
pub fn negotiate<R: CryptoRng + RngCore>(
    rng: &mut R,
    server_public_key: &[u8],
) -> Result<(SymmetricKey, Vec<u8>), CryptoError> {
    let pem = std::str::from_utf8(server_public_key).map_err(|_| CryptoError::InvalidPublicKey {
        reason: "public key is not UTF-8 text".to_string(),
    })?;
    let public = parse_public_key_pem(pem)?;

    let key = SymmetricKey::generate(rng);
    let wrapped = wrap_symmetric_key(rng, &public, &key)?;
    Ok((key, wrapped))
}

/// Encrypt `key` to `public` with RSA-OAEP (SHA-256).
///
/// # Errors
///
/// - `CryptoError::Handshake` if the modulus is too small for the key
pub fn wrap_symmetric_key<R: CryptoRng + RngCore>(
    rng: &mut R,
    public: &RsaPublicKey,
    key: &SymmetricKey,
) -> Result<Vec<u8>, CryptoError> {
    public
        .encrypt(rng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| CryptoError::Handshake { reason: format!("oaep encrypt: {e}") })
}

/// Server side of the handshake: recover the client's symmetric key.
///
/// # Errors
///
/// - `CryptoError::Handshake` on any failure: wrong ciphertext size,
///   corruption, a ciphertext made for another key, or a recovered key that
///   is not exactly [`SYMMETRIC_KEY_SIZE`] bytes
///
/// # Security
///
/// The error carries no detail from the OAEP decoder beyond what `rsa`
/// reports, and intermediate plaintext is zeroized.
pub fn unwrap_symmetric_key(
    private: &RsaPrivateKey,
    ciphertext: &[u8],
) -> Result<SymmetricKey, CryptoError> {
    let recovered = Zeroizing::new(
        private
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|e| CryptoError::Handshake { reason: format!("oaep decrypt: {e}") })?,
    );

    let bytes: [u8; SYMMETRIC_KEY_SIZE] =
        recovered.as_slice().try_into().map_err(|_| CryptoError::Handshake {
            reason: format!(
                "symmetric key is {} bytes, expected {SYMMETRIC_KEY_SIZE}",
                recovered.len()
            ),
        })?;

    Ok(SymmetricKey::from_bytes(bytes))
}
