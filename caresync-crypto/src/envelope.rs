//! Record envelopes: the at-rest JSON shape of an encrypted record.
//!
//! A sealed record is replaced by an envelope object carrying the base64
//! ciphertext, the base64 nonce, and a small plaintext index of fields
//! copied out before encryption so lookups can run without decrypting.
//!
//! ```json
//! { "id": "p1", "ciphertext": "...", "iv": "...", "index": { "last_name": "Okafor" } }
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cipher::{decrypt, encrypt, EncryptedData, NONCE_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Record id, kept in the clear so the store can address the row.
    pub id: String,
    /// Base64 ChaCha20-Poly1305 ciphertext (includes the Poly1305 tag).
    pub ciphertext: String,
    /// Base64 nonce, fresh per seal.
    pub iv: String,
    /// Plaintext lookup fields copied from the record before encryption.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub index: Map<String, Value>,
}

/// Whether a JSON value already has the envelope shape.
///
/// Used as a re-seal guard: sealing an envelope again would double-encrypt
/// and lose the index fields.
pub fn is_envelope(value: &Value) -> bool {
    match value.as_object() {
        Some(obj) => {
            obj.get("ciphertext").is_some_and(Value::is_string)
                && obj.get("iv").is_some_and(Value::is_string)
        }
        None => false,
    }
}

/// Seals a record into an envelope.
///
/// Fields named in `index_fields` are copied into the plaintext index when
/// present on the record; missing fields are skipped. Passing a value that is
/// already an envelope returns it unchanged.
pub fn seal(
    key: &DerivedKey,
    id: &str,
    record: &Value,
    index_fields: &[&str],
) -> CryptoResult<Value> {
    if is_envelope(record) {
        return Ok(record.clone());
    }

    let plaintext = serde_json::to_vec(record)?;
    let sealed = encrypt(key, &plaintext)?;

    let mut index = Map::new();
    if let Some(obj) = record.as_object() {
        for field in index_fields {
            if let Some(v) = obj.get(*field) {
                index.insert((*field).to_string(), v.clone());
            }
        }
    }

    let envelope = Envelope {
        id: id.to_string(),
        ciphertext: BASE64.encode(&sealed.ciphertext),
        iv: BASE64.encode(sealed.nonce),
        index,
    };
    Ok(serde_json::to_value(envelope)?)
}

/// Opens an envelope back into the original record.
///
/// Non-envelope values pass through unchanged so plaintext record kinds can
/// share the same read path. Index fields are merged into the result only
/// where the decrypted record lacks them; the decrypted value always wins.
pub fn open(key: &DerivedKey, value: &Value) -> CryptoResult<Value> {
    if !is_envelope(value) {
        return Ok(value.clone());
    }

    let envelope: Envelope = serde_json::from_value(value.clone())
        .map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))?;

    let ciphertext = BASE64
        .decode(&envelope.ciphertext)
        .map_err(|e| CryptoError::MalformedEnvelope(format!("ciphertext not base64: {e}")))?;
    let nonce_bytes = BASE64
        .decode(&envelope.iv)
        .map_err(|e| CryptoError::MalformedEnvelope(format!("iv not base64: {e}")))?;
    let nonce: [u8; NONCE_SIZE] = nonce_bytes
        .try_into()
        .map_err(|_| CryptoError::MalformedEnvelope("iv has wrong length".into()))?;

    let plaintext = decrypt(key, &EncryptedData { nonce, ciphertext })?;
    let mut record: Value = serde_json::from_slice(&plaintext)?;

    if let Some(obj) = record.as_object_mut() {
        for (k, v) in envelope.index {
            obj.entry(k).or_insert(v);
        }
    }
    Ok(record)
}
