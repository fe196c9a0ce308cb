//! Authoritative certificate records.
//!
//! The verifier only needs `find_record(id)`; where the records live is up to
//! the caller. A JSON file store is provided for the command-line tool.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CertError, Result};

/// The certificate store's current view of a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub certificate_id: String,
    pub current_owner_id: String,
    pub current_owner_name: String,
    #[serde(default)]
    pub current_owner_email: String,
    pub serial_number: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ownership_history: Vec<HistoryRecord>,
    /// Hex SHA-256 anchor written by the most recent seal, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sealed_hash: Option<String>,
}

/// One entry of the store's ownership history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub action: String,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub owner_email: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Lookup of a certificate record by id.
pub trait RecordStore {
    fn find_record(&self, certificate_id: &str) -> Option<Record>;
}

impl RecordStore for HashMap<String, Record> {
    fn find_record(&self, certificate_id: &str) -> Option<Record> {
        self.get(certificate_id).cloned()
    }
}

impl<F> RecordStore for F
where
    F: Fn(&str) -> Option<Record>,
{
    fn find_record(&self, certificate_id: &str) -> Option<Record> {
        self(certificate_id)
    }
}

/// Records kept in a JSON array on disk.
#[derive(Debug, Clone, Default)]
pub struct JsonRecordStore {
    records: Vec<Record>,
}

impl JsonRecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Parse a store from JSON bytes.
    pub fn from_json(json_bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(serde_json::from_slice(json_bytes)?))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.records)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records the integrity anchor for a certificate.
    ///
    /// A certificate is anchored at most once; an existing anchor is never
    /// overwritten.
    pub fn anchor(&mut self, certificate_id: &str, hash_hex: &str) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.certificate_id == certificate_id)
            .ok_or(CertError::RecordNotFound)?;

        if record.sealed_hash.is_some() {
            return Err(CertError::AlreadySealed {
                certificate_id: certificate_id.to_string(),
            });
        }

        record.sealed_hash = Some(hash_hex.to_string());
        Ok(())
    }
}

impl RecordStore for JsonRecordStore {
    fn find_record(&self, certificate_id: &str) -> Option<Record> {
        self.records
            .iter()
            .find(|r| r.certificate_id == certificate_id)
            .cloned()
    }
}
