//! File encryption with AES-256-CBC and PKCS#7 padding.
//!
//! [`encrypt_file`] is pure: the IV is supplied by the caller. [`seal_file`]
//! draws the IV from an RNG. On the wire a blob is `iv || ciphertext` with no
//! separator.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::{error::CryptoError, keys::SymmetricKey};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// CBC initialization vector size (one block).
pub const IV_SIZE: usize = BLOCK_SIZE;

/// Encrypted file contents.
///
/// # Invariants
///
/// - `ciphertext.len()` is a non-zero multiple of [`BLOCK_SIZE`]: PKCS#7
///   always adds at least one byte of padding, so even an empty file
///   encrypts to one block.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    iv: [u8; IV_SIZE],
    ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Initialization vector.
    #[must_use]
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// Padded ciphertext.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Length of the wire encoding.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        IV_SIZE + self.ciphertext.len()
    }

    /// Wire encoding: `iv || ciphertext`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse the wire encoding.
    ///
    /// # Errors
    ///
    /// - `CryptoError::Decryption` if `bytes` is shorter than an IV plus one
    ///   block, or the ciphertext is not block-aligned
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < IV_SIZE + BLOCK_SIZE {
            return Err(CryptoError::Decryption {
                reason: format!(
                    "blob is {} bytes, need at least {}",
                    bytes.len(),
                    IV_SIZE + BLOCK_SIZE
                ),
            });
        }

        let (iv, ciphertext) = bytes.split_at(IV_SIZE);
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::Decryption {
                reason: format!(
                    "ciphertext length {} is not a multiple of {BLOCK_SIZE}",
                    ciphertext.len()
                ),
            });
        }

        let mut iv_bytes = [0u8; IV_SIZE];
        iv_bytes.copy_from_slice(iv);
        Ok(Self { iv: iv_bytes, ciphertext: ciphertext.to_vec() })
    }
}

impl Drop for EncryptedBlob {
    fn drop(&mut self) {
        self.iv.zeroize();
        self.ciphertext.zeroize();
    }
}

impl std::fmt::Debug for EncryptedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedBlob")
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

/// Fresh random IV.
pub fn generate_iv<R: CryptoRng + RngCore>(rng: &mut R) -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    rng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext` under `key` with the given IV.
///
/// # Security
///
/// The IV MUST be fresh for every encryption under the same key. Use
/// [`seal_file`] unless the IV is deliberately fixed for a test vector.
#[must_use]
pub fn encrypt_file(key: &SymmetricKey, plaintext: &[u8], iv: [u8; IV_SIZE]) -> EncryptedBlob {
    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    EncryptedBlob { iv, ciphertext }
}

/// Encrypt `plaintext` under `key` with a fresh random IV.
pub fn seal_file<R: CryptoRng + RngCore>(
    rng: &mut R,
    key: &SymmetricKey,
    plaintext: &[u8],
) -> EncryptedBlob {
    encrypt_file(key, plaintext, generate_iv(rng))
}

/// Decrypt a blob and strip its padding.
///
/// The plaintext buffer is zeroized on drop, and nothing is returned unless
/// the padding checks out, so a failure never yields truncated output.
///
/// # Errors
///
/// - `CryptoError::Decryption` if the ciphertext is empty or not
///   block-aligned
/// - `CryptoError::Padding` if the trailing padding is malformed (typically
///   a wrong key or corrupted ciphertext)
pub fn decrypt_file(
    key: &SymmetricKey,
    blob: &EncryptedBlob,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if blob.ciphertext.is_empty() || blob.ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::Decryption {
            reason: format!("ciphertext length {} is not block-aligned", blob.ciphertext.len()),
        });
    }

    let mut buffer = Zeroizing::new(blob.ciphertext.clone());
    let plaintext_len = Aes256CbcDec::new(key.as_bytes().into(), (&blob.iv).into())
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| CryptoError::Padding)?
        .len();
    buffer.truncate(plaintext_len);

    Ok(buffer)
}
