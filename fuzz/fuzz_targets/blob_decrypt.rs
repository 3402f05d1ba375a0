//! Fuzz target for encrypted blob parsing and decryption
//!
//! The third frame of a session is attacker-controlled until decrypted.
//!
//! # Invariants
//!
//! - Parsing and decryption NEVER panic
//! - Decryption either fails or returns fewer bytes than the ciphertext
//! - A blob sealed under the key always decrypts to its plaintext

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealdrop_crypto::{EncryptedBlob, SymmetricKey, decrypt_file, encrypt_file};

#[derive(Debug, Arbitrary)]
struct Input {
    key: [u8; 32],
    iv: [u8; 16],
    wire: Vec<u8>,
    plaintext: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let key = SymmetricKey::from_bytes(input.key);

    if let Ok(blob) = EncryptedBlob::from_bytes(&input.wire) {
        if let Ok(plaintext) = decrypt_file(&key, &blob) {
            assert!(plaintext.len() < blob.ciphertext().len());
        }
    }

    let sealed = encrypt_file(&key, &input.plaintext, input.iv);
    let parsed = EncryptedBlob::from_bytes(&sealed.to_bytes()).unwrap();
    assert_eq!(decrypt_file(&key, &parsed).unwrap().as_slice(), input.plaintext.as_slice());
});
