//! Certificate payload and canonical serialization.
//!
//! The payload is the content a sealed image proves. Its canonical byte form
//! is hashed at seal time and re-hashed at verification time, so the
//! serialization must be byte-deterministic: sorted keys, compact output,
//! UTF-8.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::crypto::sha256_bytes;
use crate::error::Result;

/// The plaintext hidden inside a certificate image.
///
/// Aliases accept the short field names used by legacy unencrypted images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(alias = "certId")]
    pub certificate_id: String,
    pub owner_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub owner_name: String,
    #[serde(alias = "verifiedAt")]
    pub verified_at_timestamp: String,
    #[serde(alias = "validator", default, deserialize_with = "null_as_empty")]
    pub validator_name: String,
    #[serde(alias = "serial")]
    pub serial_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(alias = "history", default)]
    pub ownership_history_summary: Vec<HistoryEntry>,
}

/// One step of the ownership history at seal time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(alias = "a")]
    pub action: String,
    #[serde(alias = "o", default, deserialize_with = "null_as_empty")]
    pub owner_name: String,
    #[serde(alias = "d")]
    pub timestamp: String,
}

/// Legacy sealers wrote `null` for unknown names.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Payload {
    /// Parse a payload from JSON bytes.
    pub fn from_json(json_bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json_bytes)?)
    }

    /// Canonical serialization: recursively sorted keys, no whitespace.
    pub fn canonical_json(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        Ok(canonicalize_json(&value))
    }

    /// SHA-256 over the canonical serialization.
    pub fn canonical_hash(&self) -> Result<[u8; 32]> {
        Ok(sha256_bytes(self.canonical_json()?.as_bytes()))
    }
}

/// Recursively sort JSON object keys and produce compact output.
pub fn canonicalize_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));

            let pairs: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("\"{}\":{}", escape_json_string(k), canonicalize_json(v)))
                .collect();

            format!("{{{}}}", pairs.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(canonicalize_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::String(s) => format!("\"{}\"", escape_json_string(s)),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Null => "null".to_string(),
    }
}

/// Escape special characters in JSON strings.
fn escape_json_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}
