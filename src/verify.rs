//! Core verification logic.
//!
//! Runs the verification pipeline for a certificate image:
//! reveal frame → unseal payload → look up record → check serial →
//! compare owner → check integrity anchor → build redacted report.
//!
//! Verification never fails with an error. Every outcome, including hostile
//! or random input, is reported as a [`VerificationVerdict`].

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::crypto::SealKey;
use crate::payload::Payload;
use crate::raster::RasterImage;
use crate::record::{HistoryRecord, Record, RecordStore};
use crate::sealed::unseal;
use crate::stego::reveal;
use crate::verdict::VerificationVerdict;

/// Owner name shown when the image belongs to a previous owner.
pub const PROTECTED_OWNER_NAME: &str = "Protected (ownership has changed)";

/// Owner email shown when the image belongs to a previous owner.
pub const PROTECTED_OWNER_EMAIL: &str = "Privacy protected";

/// Shown when the embedded payload carries no owner name.
pub const UNKNOWN_OWNER_NAME: &str = "Unknown";

/// Certificate details released to the verifier, after redaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateView {
    pub certificate_id: String,
    pub serial_number: String,
    pub status: String,
    pub owner_name: String,
    pub owner_email: String,
    pub history: Vec<HistoryRecord>,
}

impl CertificateView {
    /// Full details for the current owner, placeholders and no history otherwise.
    fn redacted(record: Record, is_owner_match: bool) -> Self {
        let (owner_name, owner_email, history) = if is_owner_match {
            let name = if record.current_owner_name.is_empty() {
                record.current_owner_email.clone()
            } else {
                record.current_owner_name
            };
            (name, record.current_owner_email, record.ownership_history)
        } else {
            (
                PROTECTED_OWNER_NAME.to_string(),
                PROTECTED_OWNER_EMAIL.to_string(),
                Vec::new(),
            )
        };

        Self {
            certificate_id: record.certificate_id,
            serial_number: record.serial_number,
            status: record.status,
            owner_name,
            owner_email,
            history,
        }
    }
}

/// Serial numbers reported on a mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialConflict {
    pub image_serial: String,
    pub record_serial: String,
}

/// Result of verifying one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub verdict: VerificationVerdict,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_owner_match: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_owner_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_conflict: Option<SerialConflict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateView>,
}

impl VerificationReport {
    fn rejected(verdict: VerificationVerdict, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        debug!(?verdict, %reason, "Verification rejected");
        Self {
            verdict,
            reason,
            is_owner_match: None,
            image_owner_name: None,
            serial_conflict: None,
            certificate: None,
        }
    }

    pub fn is_authentic(&self) -> bool {
        self.verdict.is_authentic()
    }
}

/// Verify an encoded image file (PNG) against the record store.
///
/// Undecodable bytes are reported as `NoHiddenData`.
pub fn verify_image_bytes<S>(image_bytes: &[u8], key: &SealKey, store: &S) -> VerificationReport
where
    S: RecordStore + ?Sized,
{
    match RasterImage::decode(image_bytes) {
        Ok(image) => verify_image(&image, key, store),
        Err(e) => VerificationReport::rejected(
            VerificationVerdict::NoHiddenData,
            format!("Image could not be decoded: {}", e),
        ),
    }
}

/// Verify a decoded raster against the record store.
pub fn verify_image<S>(image: &RasterImage, key: &SealKey, store: &S) -> VerificationReport
where
    S: RecordStore + ?Sized,
{
    // Step 1: Reveal framed bytes
    let revealed = match reveal(image) {
        Ok(bytes) => bytes,
        Err(e) => return VerificationReport::rejected(VerificationVerdict::NoHiddenData, e.to_string()),
    };
    debug!(bytes = revealed.len(), "Revealed hidden message");

    // Step 2: Unseal payload
    let message = match String::from_utf8(revealed) {
        Ok(message) => message,
        Err(_) => {
            return VerificationReport::rejected(
                VerificationVerdict::MalformedPayload,
                "Hidden data is not valid UTF-8",
            )
        }
    };
    let payload = match unseal(&message, key) {
        Ok(payload) => payload,
        Err(e) => return VerificationReport::rejected(VerificationVerdict::MalformedPayload, e.to_string()),
    };
    if payload.certificate_id.is_empty() {
        return VerificationReport::rejected(
            VerificationVerdict::MalformedPayload,
            "Certificate data in image is incomplete",
        );
    }

    verify_payload(&payload, store)
}

/// Cross-check an unsealed payload against its authoritative record.
pub fn verify_payload<S>(payload: &Payload, store: &S) -> VerificationReport
where
    S: RecordStore + ?Sized,
{
    // Step 3: Look up record
    let Some(record) = store.find_record(&payload.certificate_id) else {
        return VerificationReport::rejected(
            VerificationVerdict::RecordNotFound,
            format!("Certificate {} not found in records", payload.certificate_id),
        );
    };

    // Step 4: Serial check
    if payload.serial_number != record.serial_number {
        let mut report = VerificationReport::rejected(
            VerificationVerdict::SerialMismatch,
            "Certificate number in image differs from the record",
        );
        report.serial_conflict = Some(SerialConflict {
            image_serial: payload.serial_number.clone(),
            record_serial: record.serial_number,
        });
        return report;
    }

    // Step 5: Ownership check
    let is_owner_match = payload.owner_id == record.current_owner_id;
    debug!(
        image_owner = %payload.owner_id,
        record_owner = %record.current_owner_id,
        is_owner_match,
        "Ownership check"
    );

    // Step 6: Integrity anchor
    let mut verdict = VerificationVerdict::Valid;
    if let Some(anchor) = record.sealed_hash.as_deref() {
        let recomputed = match payload.canonical_hash() {
            Ok(hash) => hex::encode(hash),
            Err(e) => return VerificationReport::rejected(VerificationVerdict::MalformedPayload, e.to_string()),
        };
        debug!(extracted = %recomputed, anchor, "Integrity check");

        if !recomputed.eq_ignore_ascii_case(anchor) {
            if is_owner_match {
                warn!(
                    certificate_id = %payload.certificate_id,
                    "Integrity breach on current owner's image"
                );
                return VerificationReport::rejected(
                    VerificationVerdict::TamperDetected,
                    "Digital seal is invalid: image data was modified",
                );
            }
            debug!("Hash mismatch with changed ownership, treating as outdated");
            verdict = VerificationVerdict::ValidButOutdated;
        }
    }

    // Step 7: Redacted response
    let image_owner_name = if payload.owner_name.is_empty() {
        UNKNOWN_OWNER_NAME.to_string()
    } else {
        payload.owner_name.clone()
    };

    info!(
        certificate_id = %payload.certificate_id,
        ?verdict,
        is_owner_match,
        "Verification complete"
    );

    VerificationReport {
        verdict,
        reason: verdict.explanation().to_string(),
        is_owner_match: Some(is_owner_match),
        image_owner_name: Some(image_owner_name),
        serial_conflict: None,
        certificate: Some(CertificateView::redacted(record, is_owner_match)),
    }
}
