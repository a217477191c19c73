//! Key lifecycle for a running client.
//!
//! A [`KeyContext`] starts locked. It is unlocked either by deriving a key
//! from a passphrase (Argon2id, salt persisted next to the keystore) or by
//! loading a generated key from a keystore file, creating one on first use.
//! The file-backed mode holds the key unwrapped on disk and is meant for
//! development setups, not production deployments.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{CryptoError, CryptoResult};
use crate::key::{derive_key, generate_random_key, DerivedKey, Salt, KEY_SIZE};

#[derive(Debug, Default)]
pub struct KeyContext {
    key: Option<DerivedKey>,
}

impl KeyContext {
    /// A context with no key material. All seal/open calls fail until unlocked.
    pub fn locked() -> Self {
        Self { key: None }
    }

    pub fn is_unlocked(&self) -> bool {
        self.key.is_some()
    }

    /// Derives the key from a passphrase. No-op if already unlocked.
    pub fn unlock_with_passphrase(&mut self, passphrase: &str, salt: &Salt) -> CryptoResult<()> {
        if self.key.is_some() {
            return Ok(());
        }
        self.key = Some(derive_key(passphrase, salt)?);
        Ok(())
    }

    /// Loads the key from `path`, generating and persisting one if the file
    /// does not exist. No-op if already unlocked.
    pub fn unlock_from_file(&mut self, path: &Path) -> CryptoResult<()> {
        if self.key.is_some() {
            return Ok(());
        }

        let key = if path.exists() {
            let encoded = fs::read_to_string(path)?;
            let bytes = BASE64
                .decode(encoded.trim())
                .map_err(|e| CryptoError::KeyDerivation(format!("keystore not base64: {e}")))?;
            let bytes: [u8; KEY_SIZE] = bytes
                .try_into()
                .map_err(|_| CryptoError::KeyDerivation("keystore key has wrong length".into()))?;
            DerivedKey::from_bytes(bytes)
        } else {
            let key = generate_random_key();
            fs::write(path, BASE64.encode(key.as_bytes()))?;
            key
        };

        self.key = Some(key);
        Ok(())
    }

    /// The active key, or `KeyNotInitialized` when locked.
    pub fn key(&self) -> CryptoResult<&DerivedKey> {
        self.key.as_ref().ok_or(CryptoError::KeyNotInitialized)
    }

    /// Drops the key material. The `DerivedKey` zeroizes itself.
    pub fn lock(&mut self) {
        self.key = None;
    }
}
