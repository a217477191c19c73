//! Key material: Argon2id derivation and random key generation.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// ChaCha20-Poly1305 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Argon2id salt size in bytes.
pub const SALT_SIZE: usize = 16;

/// Salt for passphrase-based key derivation.
///
/// Generated once per keystore and persisted alongside it so the passphrase
/// is the only input needed to re-derive the key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Salt(pub [u8; SALT_SIZE]);

impl Salt {
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// A 256-bit symmetric key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Argon2id cost parameters.
///
/// Defaults follow the OWASP interactive-login recommendation; raise the
/// memory cost for server-side use.
#[derive(Clone, Copy, Debug)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Derives a symmetric key from a passphrase using Argon2id defaults.
pub fn derive_key(passphrase: &str, salt: &Salt) -> CryptoResult<DerivedKey> {
    derive_key_with_params(passphrase, salt, &KdfParams::default())
}

pub fn derive_key_with_params(
    passphrase: &str,
    salt: &Salt,
    params: &KdfParams,
) -> CryptoResult<DerivedKey> {
    let argon_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut out = [0u8; KEY_SIZE];
    argon
        .hash_password_into(passphrase.as_bytes(), salt.as_bytes(), &mut out)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(DerivedKey(out))
}

/// Generates a fresh random key from the OS entropy source.
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut bytes);
    DerivedKey(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic_per_salt() {
        let salt = Salt::generate();
        let a = derive_key("correct horse", &salt).unwrap();
        let b = derive_key("correct horse", &salt).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        let other = derive_key("correct horse", &Salt::generate()).unwrap();
        assert_ne!(a.as_bytes(), other.as_bytes());
    }

    #[test]
    fn random_keys_differ() {
        assert_ne!(generate_random_key().as_bytes(), generate_random_key().as_bytes());
    }
}
