//! Authenticated encryption primitives (ChaCha20-Poly1305).

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;

use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;

/// ChaCha20-Poly1305 nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Ciphertext with the random nonce used to produce it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypts plaintext under a fresh random nonce.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedData {
        nonce: nonce.into(),
        ciphertext,
    })
}

/// Decrypts and authenticates. Fails on any tamper of nonce or ciphertext.
pub fn decrypt(key: &DerivedKey, data: &EncryptedData) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    cipher
        .decrypt(Nonce::from_slice(&data.nonce), data.ciphertext.as_ref())
        .map_err(|_| {
            CryptoError::Decryption("authentication failed (wrong key or tampered data)".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::generate_random_key;

    #[test]
    fn round_trip() {
        let key = generate_random_key();
        let sealed = encrypt(&key, b"vitals: bp 120/80").unwrap();
        assert_eq!(decrypt(&key, &sealed).unwrap(), b"vitals: bp 120/80");
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = encrypt(&generate_random_key(), b"secret").unwrap();
        assert!(decrypt(&generate_random_key(), &sealed).is_err());
    }

    #[test]
    fn ciphertext_carries_tag_overhead() {
        let key = generate_random_key();
        let sealed = encrypt(&key, b"x").unwrap();
        assert_eq!(sealed.ciphertext.len(), 1 + TAG_SIZE);
    }
}
