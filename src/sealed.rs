//! Sealed certificate messages.
//!
//! A sealed message is the transport string embedded into the image:
//!
//! ```text
//! hex(iv, 12 bytes) ":" hex(auth tag, 16 bytes) ":" hex(ciphertext)
//! ```
//!
//! Images produced before encryption was introduced carry the payload JSON in
//! the clear; those are still accepted on the way in.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::crypto::{decrypt_aes_gcm, encrypt_aes_gcm, sha256_bytes, SealKey, NONCE_LEN, TAG_LEN};
use crate::error::{CertError, Result};
use crate::payload::Payload;

/// Separator between the three hex fields.
pub const FIELD_SEPARATOR: char = ':';

/// IV, authentication tag and ciphertext of an encrypted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    pub iv: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl fmt::Display for SealedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            hex::encode(self.iv),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext),
            sep = FIELD_SEPARATOR
        )
    }
}

impl FromStr for SealedMessage {
    type Err = CertError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(FIELD_SEPARATOR).collect();
        let [iv_hex, tag_hex, ciphertext_hex] = parts.as_slice() else {
            return Err(CertError::DecryptionFailed);
        };

        let iv = decode_fixed::<NONCE_LEN>(iv_hex)?;
        let tag = decode_fixed::<TAG_LEN>(tag_hex)?;
        let ciphertext = hex::decode(ciphertext_hex).map_err(|_| CertError::DecryptionFailed)?;

        Ok(Self { iv, tag, ciphertext })
    }
}

fn decode_fixed<const N: usize>(encoded: &str) -> Result<[u8; N]> {
    hex::decode(encoded)
        .ok()
        .and_then(|raw| raw.try_into().ok())
        .ok_or(CertError::DecryptionFailed)
}

impl SealedMessage {
    /// Decrypt and parse the payload. Any failure is `DecryptionFailed`.
    pub fn open(&self, key: &SealKey) -> Result<Payload> {
        let plaintext = decrypt_aes_gcm(key, &self.iv, &self.tag, &self.ciphertext)?;
        serde_json::from_slice(&plaintext).map_err(|_| CertError::DecryptionFailed)
    }
}

/// What an image's revealed text decodes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedMessage {
    /// Unencrypted payload JSON written by older sealers.
    LegacyPlaintext(Payload),
    /// `iv:tag:ciphertext` encrypted payload.
    Sealed(SealedMessage),
}

impl EmbeddedMessage {
    /// Tries the legacy plaintext form first, then the sealed form.
    pub fn parse(text: &str) -> Result<Self> {
        if let Ok(payload) = serde_json::from_str::<Payload>(text) {
            return Ok(Self::LegacyPlaintext(payload));
        }
        text.parse().map(Self::Sealed)
    }
}

/// Result of sealing a payload.
#[derive(Debug, Clone)]
pub struct Sealed {
    /// Transport string to embed into the image.
    pub message: String,
    /// SHA-256 of the canonical payload bytes, persisted as the integrity anchor.
    pub integrity_hash: [u8; 32],
}

impl Sealed {
    pub fn integrity_hash_hex(&self) -> String {
        hex::encode(self.integrity_hash)
    }
}

/// Serialize, hash and encrypt a payload.
pub fn seal(payload: &Payload, key: &SealKey) -> Result<Sealed> {
    let canonical = payload.canonical_json()?;
    let integrity_hash = sha256_bytes(canonical.as_bytes());

    let parts = encrypt_aes_gcm(key, canonical.as_bytes())?;
    let message = SealedMessage {
        iv: parts.iv,
        tag: parts.tag,
        ciphertext: parts.ciphertext,
    }
    .to_string();

    debug!(
        certificate_id = %payload.certificate_id,
        plaintext_bytes = canonical.len(),
        "Sealed payload"
    );

    Ok(Sealed {
        message,
        integrity_hash,
    })
}

/// Recover a payload from a revealed transport string.
pub fn unseal(message: &str, key: &SealKey) -> Result<Payload> {
    match EmbeddedMessage::parse(message)? {
        EmbeddedMessage::LegacyPlaintext(payload) => {
            debug!("Revealed message is legacy plaintext");
            Ok(payload)
        }
        EmbeddedMessage::Sealed(sealed) => sealed.open(key),
    }
}
