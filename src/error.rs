//! Error types for certificate sealing and verification.

use thiserror::Error;

/// Sealing, extraction and verification errors with specific exit codes.
///
/// Serial mismatch and tampering are verdicts, not errors. Exit codes 4 and 5
/// belong to those verdicts.
#[derive(Error, Debug)]
pub enum CertError {
    #[error("Image is too small: needs {needed_bits} bits, has {capacity_bits} capacity")]
    CapacityExceeded {
        needed_bits: usize,
        capacity_bits: usize,
    },

    #[error("No hidden certificate data found in image")]
    NoHiddenData,

    #[error("Hidden data frame is corrupted or invalid")]
    MalformedFrame,

    #[error("Could not decrypt hidden data. Wrong key or corrupted image")]
    DecryptionFailed,

    #[error("Certificate not found in records")]
    RecordNotFound,

    #[error("Seal key must be exactly 32 bytes (64 hex characters)")]
    InvalidKey,

    #[error("Raster buffer is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    InvalidRaster {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Certificate {certificate_id} already has a sealed hash")]
    AlreadySealed { certificate_id: String },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CertError {
    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CertError::NoHiddenData => 1,
            CertError::MalformedFrame => 1,
            CertError::DecryptionFailed => 2,
            CertError::RecordNotFound => 3,
            CertError::CapacityExceeded { .. } => 6,
            CertError::InvalidKey => 7,
            CertError::InvalidRaster { .. } => 8,
            CertError::Image(_) => 8,
            CertError::AlreadySealed { .. } => 9,
            CertError::Io(_) => 10,
            CertError::Json(_) => 11,
        }
    }
}

pub type Result<T> = std::result::Result<T, CertError>;
