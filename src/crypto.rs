//! Cryptographic operations for certificate sealing.
//!
//! Implements SHA-256 integrity hashing and AES-256-GCM encryption with a
//! detached authentication tag, plus the 32-byte seal key configuration value.

use std::fmt;

use aes_gcm::{
    aead::{AeadCore, AeadInPlace, KeyInit, OsRng},
    Aes256Gcm, Nonce, Tag,
};
use sha2::{Digest, Sha256};

use crate::error::{CertError, Result};

/// AES-GCM nonce (IV) length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Seal key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Computes SHA-256 hash of data and returns raw bytes.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    hash.into()
}

/// Symmetric key used to seal and unseal certificate payloads.
///
/// Supplied explicitly by the caller; there is no process-wide default.
#[derive(Clone, PartialEq, Eq)]
pub struct SealKey([u8; KEY_LEN]);

impl SealKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a key from exactly 64 hex characters.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let raw = hex::decode(encoded.trim()).map_err(|_| CertError::InvalidKey)?;
        let bytes: [u8; KEY_LEN] = raw.try_into().map_err(|_| CertError::InvalidKey)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SealKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealKey(<redacted>)")
    }
}

/// Output of a detached AES-256-GCM encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcmParts {
    pub iv: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

/// Encrypts plaintext with AES-256-GCM under a fresh random 12-byte IV.
pub fn encrypt_aes_gcm(key: &SealKey, plaintext: &[u8]) -> Result<GcmParts> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CertError::InvalidKey)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(&nonce, b"", &mut buffer)
        .map_err(|_| CertError::DecryptionFailed)?;

    Ok(GcmParts {
        iv: nonce.into(),
        tag: tag.into(),
        ciphertext: buffer,
    })
}

/// Decrypts AES-256-GCM ciphertext, verifying the detached authentication tag.
///
/// Any tag mismatch (wrong key, modified ciphertext or tag) is a hard failure.
pub fn decrypt_aes_gcm(key: &SealKey, iv: &[u8], tag: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if iv.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(CertError::DecryptionFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CertError::InvalidKey)?;

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(Nonce::from_slice(iv), b"", &mut buffer, Tag::from_slice(tag))
        .map_err(|_| CertError::DecryptionFailed)?;

    Ok(buffer)
}
