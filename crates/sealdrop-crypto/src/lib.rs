//! Sealdrop Cryptographic Primitives
//!
//! Key handling, key transport and file encryption for sealdrop. Functions
//! that need randomness take the RNG as a parameter so tests can run the
//! whole handshake from a seeded generator.
//!
//! # Key Lifecycle
//!
//! ```text
//! Server RSA key pair (long-lived, persisted by the server)
//!        │
//!        ▼
//! publish_public_key → client: negotiate → SymmetricKey (per session)
//!        │                                     │
//!        ▼                                     ▼
//! unwrap_symmetric_key ◀── RSA-OAEP ──── wrapped key
//!        │
//!        ▼
//! seal_file → AES-256-CBC → iv || ciphertext → decrypt_file
//! ```
//!
//! # Security
//!
//! - Symmetric keys, blobs and decrypted plaintext are zeroized on drop.
//! - `Debug` output never contains key bytes or plaintext.
//! - CBC provides confidentiality only. There is no authentication tag, so a
//!   tampered blob is detected only if it breaks the padding.
//! - The server's public key is not authenticated. Both ends log its
//!   fingerprint for manual comparison.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod file_cipher;
pub mod key_exchange;
pub mod keys;

pub use error::CryptoError;
pub use file_cipher::{
    BLOCK_SIZE, EncryptedBlob, IV_SIZE, decrypt_file, encrypt_file, generate_iv, seal_file,
};
pub use key_exchange::{negotiate, publish_public_key, unwrap_symmetric_key, wrap_symmetric_key};
pub use keys::{
    AsymmetricKeyPair, DEFAULT_RSA_BITS, SYMMETRIC_KEY_SIZE, SymmetricKey, parse_public_key_pem,
    public_key_fingerprint,
};
