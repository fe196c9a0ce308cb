//! End-to-end verification scenarios: seal an image, change the store, verify.

use std::collections::HashMap;

use certseal::verify::{PROTECTED_OWNER_EMAIL, PROTECTED_OWNER_NAME};
use certseal::{
    seal_certificate, stego, verify_image, verify_image_bytes, HistoryEntry, HistoryRecord,
    JsonRecordStore, Payload, RasterImage, Record, SealKey, VerificationVerdict,
};

fn key() -> SealKey {
    SealKey::from_hex("7f3c9a1be2d4f6081a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f7081").unwrap()
}

fn carrier() -> RasterImage {
    let data: Vec<u8> = (0..120 * 90 * 4).map(|i| ((i * 31) % 251) as u8).collect();
    RasterImage::new(120, 90, data).unwrap()
}

fn payload_for(owner_id: &str, owner_name: &str) -> Payload {
    Payload {
        certificate_id: "cert-2025-0001".into(),
        owner_id: owner_id.into(),
        owner_name: owner_name.into(),
        verified_at_timestamp: "2025-04-10T09:30:00.000Z".into(),
        validator_name: "Kantor Pertanahan".into(),
        serial_number: "SHM-10.01.02.03.1.00456".into(),
        transaction_type: Some("REGISTRATION".into()),
        ownership_history_summary: vec![HistoryEntry {
            action: "VERIFIED".into(),
            owner_name: owner_name.into(),
            timestamp: "2025-04-10T09:30:00.000Z".into(),
        }],
    }
}

fn record_for(owner_id: &str, owner_name: &str, sealed_hash: Option<String>) -> Record {
    Record {
        certificate_id: "cert-2025-0001".into(),
        current_owner_id: owner_id.into(),
        current_owner_name: owner_name.into(),
        current_owner_email: format!("{}@example.com", owner_id),
        serial_number: "SHM-10.01.02.03.1.00456".into(),
        status: "VERIFIED".into(),
        ownership_history: vec![HistoryRecord {
            action: "VERIFIED".into(),
            owner_name: owner_name.into(),
            owner_email: format!("{}@example.com", owner_id),
            date: "2025-04-10".into(),
            note: None,
        }],
        sealed_hash,
    }
}

fn store_of(record: Record) -> HashMap<String, Record> {
    HashMap::from([(record.certificate_id.clone(), record)])
}

#[test]
fn fresh_image_has_no_hidden_data() {
    let store = store_of(record_for("owner-a", "Ani", None));
    let report = verify_image(&carrier(), &key(), &store);
    assert_eq!(report.verdict, VerificationVerdict::NoHiddenData);
    assert!(report.certificate.is_none());
}

#[test]
fn sealed_image_for_current_owner_is_valid() {
    let payload = payload_for("owner-a", "Ani");
    let outcome = seal_certificate(carrier(), &payload, &key()).unwrap();
    let store = store_of(record_for("owner-a", "Ani", Some(outcome.integrity_hash_hex())));

    let report = verify_image(&outcome.image, &key(), &store);
    assert_eq!(report.verdict, VerificationVerdict::Valid);
    assert_eq!(report.is_owner_match, Some(true));

    let view = report.certificate.unwrap();
    assert_eq!(view.owner_name, "Ani");
    assert_eq!(view.owner_email, "owner-a@example.com");
    assert_eq!(view.history.len(), 1);
}

#[test]
fn sealed_image_survives_png_roundtrip() {
    let payload = payload_for("owner-a", "Ani");
    let outcome = seal_certificate(carrier(), &payload, &key()).unwrap();
    let png = outcome.image.encode_png().unwrap();
    let store = store_of(record_for("owner-a", "Ani", Some(outcome.integrity_hash_hex())));

    let report = verify_image_bytes(&png, &key(), &store);
    assert_eq!(report.verdict, VerificationVerdict::Valid);
}

#[test]
fn image_from_previous_owner_is_outdated_and_redacted() {
    let old = seal_certificate(carrier(), &payload_for("owner-a", "Ani"), &key()).unwrap();
    // Ownership moved to owner-b and the certificate was re-sealed for them
    let new = seal_certificate(carrier(), &payload_for("owner-b", "Bayu"), &key()).unwrap();
    let store = store_of(record_for("owner-b", "Bayu", Some(new.integrity_hash_hex())));

    let report = verify_image(&old.image, &key(), &store);
    assert_eq!(report.verdict, VerificationVerdict::ValidButOutdated);
    assert_eq!(report.is_owner_match, Some(false));
    assert_eq!(report.image_owner_name.as_deref(), Some("Ani"));

    let view = report.certificate.unwrap();
    assert_eq!(view.owner_name, PROTECTED_OWNER_NAME);
    assert_eq!(view.owner_email, PROTECTED_OWNER_EMAIL);
    assert!(view.history.is_empty());

    let current = verify_image(&new.image, &key(), &store);
    assert_eq!(current.verdict, VerificationVerdict::Valid);
}

#[test]
fn altered_payload_for_same_owner_is_tamper() {
    let genuine = payload_for("owner-a", "Ani");
    let outcome = seal_certificate(carrier(), &genuine, &key()).unwrap();
    let store = store_of(record_for("owner-a", "Ani", Some(outcome.integrity_hash_hex())));

    // Forger writes a modified plaintext payload into a clean copy of the image
    let mut forged = genuine.clone();
    forged.validator_name = "Someone Else".into();
    let forged_json = serde_json::to_string(&forged).unwrap();
    let forged_image = stego::embed(carrier(), forged_json.as_bytes()).unwrap();

    let report = verify_image(&forged_image, &key(), &store);
    assert_eq!(report.verdict, VerificationVerdict::TamperDetected);
    assert!(report.certificate.is_none());
}

#[test]
fn serial_mismatch_is_reported() {
    let payload = payload_for("owner-a", "Ani");
    let outcome = seal_certificate(carrier(), &payload, &key()).unwrap();
    let mut record = record_for("owner-a", "Ani", Some(outcome.integrity_hash_hex()));
    record.serial_number = "SHM-99.99.99.99.9.99999".into();

    let report = verify_image(&outcome.image, &key(), &store_of(record));
    assert_eq!(report.verdict, VerificationVerdict::SerialMismatch);
    let conflict = report.serial_conflict.unwrap();
    assert_eq!(conflict.image_serial, "SHM-10.01.02.03.1.00456");
    assert_eq!(conflict.record_serial, "SHM-99.99.99.99.9.99999");
}

#[test]
fn unknown_certificate_is_record_not_found() {
    let outcome = seal_certificate(carrier(), &payload_for("owner-a", "Ani"), &key()).unwrap();
    let store = JsonRecordStore::new(Vec::new());

    let report = verify_image(&outcome.image, &key(), &store);
    assert_eq!(report.verdict, VerificationVerdict::RecordNotFound);
}

#[test]
fn wrong_key_is_malformed_payload() {
    let outcome = seal_certificate(carrier(), &payload_for("owner-a", "Ani"), &key()).unwrap();
    let store = store_of(record_for("owner-a", "Ani", Some(outcome.integrity_hash_hex())));
    let other = SealKey::from_hex(&"00".repeat(32)).unwrap();

    let report = verify_image(&outcome.image, &other, &store);
    assert_eq!(report.verdict, VerificationVerdict::MalformedPayload);
}

#[test]
fn legacy_plaintext_image_without_anchor_is_valid() {
    let payload = payload_for("owner-a", "Ani");
    let json = serde_json::to_string(&payload).unwrap();
    let image = stego::embed(carrier(), json.as_bytes()).unwrap();
    let store = store_of(record_for("owner-a", "Ani", None));

    let report = verify_image(&image, &key(), &store);
    assert_eq!(report.verdict, VerificationVerdict::Valid);
}

#[test]
fn closure_store_is_queried_with_embedded_id() {
    let outcome = seal_certificate(carrier(), &payload_for("owner-a", "Ani"), &key()).unwrap();
    let hash = outcome.integrity_hash_hex();
    let lookup = |id: &str| {
        assert_eq!(id, "cert-2025-0001");
        Some(record_for("owner-a", "Ani", Some(hash.clone())))
    };

    let report = verify_image(&outcome.image, &key(), &lookup);
    assert_eq!(report.verdict, VerificationVerdict::Valid);
}

#[test]
fn legacy_plaintext_with_null_names_is_valid() {
    let json = r#"{"certId":"cert-2025-0001","ownerId":"owner-a","ownerName":null,"verifiedAt":"2024-11-02T10:00:00.000Z","validator":"Kantor Pertanahan","serial":"SHM-10.01.02.03.1.00456","history":[{"a":"VERIFIED","o":null,"d":"2024-11-02T10:00:00.000Z"}]}"#;
    let image = stego::embed(carrier(), json.as_bytes()).unwrap();
    let store = store_of(record_for("owner-a", "Ani", None));

    let report = verify_image(&image, &key(), &store);
    assert_eq!(report.verdict, VerificationVerdict::Valid);
    assert_eq!(report.image_owner_name.as_deref(), Some("Unknown"));
    assert_eq!(report.certificate.unwrap().owner_name, "Ani");
}
