//! CertSeal
//!
//! Seals land-certificate images with a hidden, encrypted payload and verifies
//! them later.
//!
//! Sealing serializes a [`Payload`] canonically, hashes it, encrypts it with
//! AES-256-GCM and hides the resulting message in the least-significant bits
//! of the image's RGB channels. Verification reverses the pipeline and checks
//! the payload against the authoritative [`Record`], distinguishing valid,
//! outdated and tampered images.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//! use certseal::{seal_certificate, verify_image, Payload, RasterImage, Record, SealKey};
//!
//! # fn run(payload: Payload, records: HashMap<String, Record>) -> certseal::Result<()> {
//! let key = SealKey::from_hex(&"00".repeat(32))?;
//! let image = RasterImage::decode(&std::fs::read("certificate.png")?)?;
//!
//! // Seal and persist the anchor alongside the record
//! let outcome = seal_certificate(image, &payload, &key)?;
//! std::fs::write("certificate_sealed.png", outcome.image.encode_png()?)?;
//!
//! // Verify
//! let report = verify_image(&outcome.image, &key, &records);
//! println!("{}", report.verdict.display_name());
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod issue;
pub mod payload;
pub mod raster;
pub mod record;
pub mod sealed;
pub mod stego;
pub mod verdict;
pub mod verify;

pub use crypto::SealKey;
pub use error::{CertError, Result};
pub use issue::{ensure_unsealed, seal_certificate, SealOutcome};
pub use payload::{HistoryEntry, Payload};
pub use raster::RasterImage;
pub use record::{HistoryRecord, JsonRecordStore, Record, RecordStore};
pub use sealed::{seal, unseal, EmbeddedMessage, Sealed, SealedMessage};
pub use verdict::VerificationVerdict;
pub use verify::{verify_image, verify_image_bytes, verify_payload, CertificateView, VerificationReport};
