//! Encryption layer for CareSync.
//!
//! Provides at-rest record encryption using:
//! - Argon2id for key derivation from passphrases
//! - ChaCha20-Poly1305 for authenticated encryption
//! - Secure key management with zeroization
//!
//! Records are stored as envelopes: an opaque ciphertext plus a small
//! plaintext index of fields copied out before encryption, so common
//! lookups never need to decrypt. See [`envelope`].

mod cipher;
pub mod envelope;
mod error;
mod key;
mod keystore;

pub use cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use envelope::{is_envelope, open, seal, Envelope};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    derive_key, derive_key_with_params, generate_random_key, DerivedKey, KdfParams, Salt,
    KEY_SIZE, SALT_SIZE,
};
pub use keystore::KeyContext;
