//! Envelope seal/open behavior, including tamper detection and re-seal guards.

use std::collections::HashSet;

use caresync_crypto::{generate_random_key, is_envelope, open, seal, CryptoError};
use proptest::prelude::*;
use serde_json::{json, Value};

fn patient_record() -> Value {
    json!({
        "id": "p1",
        "first_name": "Adaeze",
        "last_name": "Okafor",
        "active": true,
        "allergies": ["penicillin"]
    })
}

#[test]
fn seal_then_open_round_trips() {
    let key = generate_random_key();
    let record = patient_record();

    let sealed = seal(&key, "p1", &record, &["last_name", "active"]).unwrap();
    assert!(is_envelope(&sealed));
    assert_eq!(sealed["id"], "p1");
    // Sensitive fields never appear in the envelope.
    assert!(sealed.get("first_name").is_none());
    assert!(sealed.get("allergies").is_none());

    let opened = open(&key, &sealed).unwrap();
    assert_eq!(opened, record);
}

#[test]
fn index_carries_only_named_fields() {
    let key = generate_random_key();
    let sealed = seal(&key, "p1", &patient_record(), &["last_name", "active"]).unwrap();

    assert_eq!(sealed["index"]["last_name"], "Okafor");
    assert_eq!(sealed["index"]["active"], true);
    assert!(sealed["index"].get("first_name").is_none());
}

#[test]
fn missing_index_fields_are_skipped() {
    let key = generate_random_key();
    let sealed = seal(&key, "p1", &patient_record(), &["no_such_field"]).unwrap();
    assert!(sealed.get("index").is_none() || sealed["index"].as_object().unwrap().is_empty());
}

#[test]
fn sealing_an_envelope_is_a_no_op() {
    let key = generate_random_key();
    let sealed = seal(&key, "p1", &patient_record(), &["last_name"]).unwrap();
    let resealed = seal(&key, "p1", &sealed, &["last_name"]).unwrap();
    assert_eq!(sealed, resealed);
}

#[test]
fn opening_a_plain_record_passes_through() {
    let key = generate_random_key();
    let record = json!({"id": "r1", "name": "Exam Room 3"});
    assert_eq!(open(&key, &record).unwrap(), record);
}

#[test]
fn nonces_are_unique_across_seals() {
    let key = generate_random_key();
    let record = patient_record();

    let mut seen = HashSet::new();
    for _ in 0..1000 {
        let sealed = seal(&key, "p1", &record, &[]).unwrap();
        let iv = sealed["iv"].as_str().unwrap().to_string();
        assert!(seen.insert(iv), "nonce reused");
    }
}

#[test]
fn tampered_ciphertext_is_rejected() {
    let key = generate_random_key();
    let mut sealed = seal(&key, "p1", &patient_record(), &[]).unwrap();

    let mut ct = sealed["ciphertext"].as_str().unwrap().to_string();
    let flipped = if ct.starts_with('A') { "B" } else { "A" };
    ct.replace_range(0..1, flipped);
    sealed["ciphertext"] = Value::String(ct);

    assert!(matches!(
        open(&key, &sealed),
        Err(CryptoError::Decryption(_) | CryptoError::MalformedEnvelope(_))
    ));
}

#[test]
fn tampered_iv_is_rejected() {
    let key = generate_random_key();
    let a = seal(&key, "p1", &patient_record(), &[]).unwrap();
    let b = seal(&key, "p1", &patient_record(), &[]).unwrap();

    let mut spliced = a.clone();
    spliced["iv"] = b["iv"].clone();
    assert!(open(&key, &spliced).is_err());
}

#[test]
fn wrong_key_is_rejected() {
    let sealed = seal(&generate_random_key(), "p1", &patient_record(), &[]).unwrap();
    assert!(matches!(
        open(&generate_random_key(), &sealed),
        Err(CryptoError::Decryption(_))
    ));
}

#[test]
fn decrypted_fields_win_over_stale_index() {
    let key = generate_random_key();
    let mut sealed = seal(&key, "p1", &patient_record(), &["last_name"]).unwrap();
    // Simulate an index written before a rename.
    sealed["index"]["last_name"] = json!("Adeyemi");

    let opened = open(&key, &sealed).unwrap();
    assert_eq!(opened["last_name"], "Okafor");
}

proptest! {
    #[test]
    fn arbitrary_string_fields_round_trip(name in ".{0,64}", notes in ".{0,256}") {
        let key = generate_random_key();
        let record = json!({"id": "x", "name": name, "notes": notes});
        let sealed = seal(&key, "x", &record, &["name"]).unwrap();
        prop_assert_eq!(open(&key, &sealed).unwrap(), record);
    }
}
