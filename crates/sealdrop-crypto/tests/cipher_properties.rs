//! Property-based tests for the handshake and file cipher
//!
//! Verifies that any file survives encryption and decryption under a key
//! agreed through the RSA handshake, and that corrupting the final block
//! never produces the original plaintext.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sealdrop_crypto::{
    AsymmetricKeyPair, BLOCK_SIZE, CryptoError, EncryptedBlob, IV_SIZE, SymmetricKey,
    decrypt_file, negotiate, publish_public_key, seal_file, unwrap_symmetric_key,
};

#[test]
fn prop_seal_then_decrypt_round_trips() {
    proptest!(|(key_bytes in any::<[u8; 32]>(), seed in any::<u64>(), plaintext in prop::collection::vec(any::<u8>(), 0..4096))| {
        let key = SymmetricKey::from_bytes(key_bytes);
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        let blob = seal_file(&mut rng, &key, &plaintext);
        prop_assert_eq!(blob.ciphertext().len() % BLOCK_SIZE, 0);
        prop_assert!(blob.ciphertext().len() > plaintext.len());

        let wire = blob.to_bytes();
        let parsed = EncryptedBlob::from_bytes(&wire).unwrap();
        let decrypted = decrypt_file(&key, &parsed).unwrap();
        prop_assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    });
}

#[test]
fn prop_corrupted_last_block_never_yields_plaintext() {
    proptest!(|(plaintext in prop::collection::vec(any::<u8>(), 0..512), flip in 1u8..=255, pos in 0usize..BLOCK_SIZE)| {
        let key = SymmetricKey::from_bytes([0x5a; 32]);
        let mut rng = ChaCha20Rng::seed_from_u64(99);

        let mut wire = seal_file(&mut rng, &key, &plaintext).to_bytes();
        let last_block = wire.len() - BLOCK_SIZE;
        wire[last_block + pos] ^= flip;

        let blob = EncryptedBlob::from_bytes(&wire).unwrap();
        match decrypt_file(&key, &blob) {
            Err(err) => prop_assert_eq!(err, CryptoError::Padding),
            Ok(garbage) => prop_assert_ne!(garbage.as_slice(), plaintext.as_slice()),
        }
    });
}

#[test]
fn full_handshake_then_file_transfer() {
    let mut server_rng = ChaCha20Rng::seed_from_u64(1);
    let mut client_rng = ChaCha20Rng::seed_from_u64(2);
    let pair = AsymmetricKeyPair::generate(&mut server_rng, 2048).unwrap();

    let published = publish_public_key(&pair).unwrap();
    let (client_key, wrapped) = negotiate(&mut client_rng, &published).unwrap();
    let server_key = unwrap_symmetric_key(pair.private_key(), &wrapped).unwrap();

    let file = b"line one\nline two\n".repeat(100);
    let wire = seal_file(&mut server_rng, &server_key, &file).to_bytes();
    assert_eq!((wire.len() - IV_SIZE) % BLOCK_SIZE, 0);

    let received = decrypt_file(&client_key, &EncryptedBlob::from_bytes(&wire).unwrap()).unwrap();
    assert_eq!(received.as_slice(), file.as_slice());
}
