//! Issuing sealed certificate images.
//!
//! Seals a payload and hides the resulting message in the certificate image.
//! Unlike verification, failures here are hard errors: they point at a
//! misconfigured key or an image too small for the payload.

use tracing::info;

use crate::crypto::SealKey;
use crate::error::{CertError, Result};
use crate::payload::Payload;
use crate::raster::RasterImage;
use crate::record::Record;
use crate::sealed::{seal, Sealed};
use crate::stego;

/// A sealed image plus the anchor the caller must persist.
#[derive(Debug, Clone)]
pub struct SealOutcome {
    pub image: RasterImage,
    pub sealed: Sealed,
}

impl SealOutcome {
    pub fn integrity_hash_hex(&self) -> String {
        self.sealed.integrity_hash_hex()
    }
}

/// Refuses to re-seal a certificate that already carries an anchor.
pub fn ensure_unsealed(record: &Record) -> Result<()> {
    match record.sealed_hash {
        Some(_) => Err(CertError::AlreadySealed {
            certificate_id: record.certificate_id.clone(),
        }),
        None => Ok(()),
    }
}

/// Seal `payload` under `key` and embed it into `image`.
pub fn seal_certificate(image: RasterImage, payload: &Payload, key: &SealKey) -> Result<SealOutcome> {
    let sealed = seal(payload, key)?;
    let image = stego::embed(image, sealed.message.as_bytes())?;

    info!(
        certificate_id = %payload.certificate_id,
        message_bytes = sealed.message.len(),
        "Certificate image sealed"
    );

    Ok(SealOutcome { image, sealed })
}
