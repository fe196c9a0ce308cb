//! Verification verdicts.
//!
//! Every verification ends in exactly one verdict. Only `Valid` and
//! `ValidButOutdated` count as authentic.

use serde::Serialize;

/// Outcome of verifying a certificate image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationVerdict {
    /// Genuine image for the current owner, integrity anchor matches.
    Valid,

    /// Genuine image that predates a legitimate ownership change.
    ValidButOutdated,

    /// Content differs from the anchor while the owner still matches.
    TamperDetected,

    /// No frame could be extracted from the image.
    NoHiddenData,

    /// A frame was found but could not be decrypted or parsed.
    MalformedPayload,

    /// The embedded certificate id is unknown to the store.
    RecordNotFound,

    /// The embedded serial number differs from the record.
    SerialMismatch,
}

impl VerificationVerdict {
    /// Whether the image is accepted as authentic.
    pub fn is_authentic(&self) -> bool {
        matches!(
            self,
            VerificationVerdict::Valid | VerificationVerdict::ValidButOutdated
        )
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            VerificationVerdict::Valid => "VALID",
            VerificationVerdict::ValidButOutdated => "VALID (OUTDATED)",
            VerificationVerdict::TamperDetected => "TAMPER DETECTED",
            VerificationVerdict::NoHiddenData => "NO HIDDEN DATA",
            VerificationVerdict::MalformedPayload => "MALFORMED PAYLOAD",
            VerificationVerdict::RecordNotFound => "RECORD NOT FOUND",
            VerificationVerdict::SerialMismatch => "SERIAL MISMATCH",
        }
    }

    /// Explanation of what this verdict means.
    pub fn explanation(&self) -> &'static str {
        match self {
            VerificationVerdict::Valid => {
                "The hidden seal is intact and matches the current certificate record."
            }
            VerificationVerdict::ValidButOutdated => {
                "The hidden seal is genuine, but ownership has changed since this image was issued."
            }
            VerificationVerdict::TamperDetected => {
                "The digital seal is invalid. Data in this image has been modified."
            }
            VerificationVerdict::NoHiddenData => {
                "No hidden authentication data found. The certificate may not be genuine or the image was modified."
            }
            VerificationVerdict::MalformedPayload => {
                "Hidden data could not be processed. The image may be damaged or sealed with a different key."
            }
            VerificationVerdict::RecordNotFound => {
                "The certificate referenced by this image does not exist in the records."
            }
            VerificationVerdict::SerialMismatch => {
                "The certificate number in the image differs from the records."
            }
        }
    }

    /// ANSI color code for terminal output.
    pub fn color_code(&self) -> &'static str {
        match self {
            VerificationVerdict::Valid => "\x1b[32m",            // Green
            VerificationVerdict::ValidButOutdated => "\x1b[33m", // Yellow
            _ => "\x1b[31m",                                     // Red
        }
    }

    /// Process exit code for the command-line tool.
    pub fn exit_code(&self) -> u8 {
        match self {
            VerificationVerdict::Valid | VerificationVerdict::ValidButOutdated => 0,
            VerificationVerdict::NoHiddenData => 1,
            VerificationVerdict::MalformedPayload => 2,
            VerificationVerdict::RecordNotFound => 3,
            VerificationVerdict::SerialMismatch => 4,
            VerificationVerdict::TamperDetected => 5,
        }
    }
}
