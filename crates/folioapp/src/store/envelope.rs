//! Storage envelopes and integrity checksums.
//!
//! Every value the [`KvStore`](super::kv::KvStore) writes is wrapped as
//!
//! ```json
//! { "data": <value>, "version": "1.0.0", "timestamp": 1704067200000, "checksum": "1a2b3c4d" }
//! ```
//!
//! The checksum is computed over the canonical JSON of `data`: the value goes through
//! `serde_json::Value` (object keys sorted) and is serialized compactly, so the same data
//! always hashes the same way no matter how its Rust type orders fields.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEnvelope<T> {
    pub data: T,
    pub version: String,
    /// Milliseconds since the epoch at save time.
    pub timestamp: i64,
    pub checksum: String,
}

impl StorageEnvelope<Value> {
    /// Wrap an already canonicalized value.
    pub fn seal(data: Value, version: &str, timestamp: i64) -> Result<Self> {
        let checksum = checksum(&canonical_json(&data)?);
        Ok(Self {
            data,
            version: version.to_string(),
            timestamp,
            checksum,
        })
    }

    /// True when the stored checksum matches the data.
    pub fn verify(&self) -> bool {
        canonical_json(&self.data)
            .map(|json| checksum(&json) == self.checksum)
            .unwrap_or(false)
    }
}

pub fn canonical_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// 32-bit rolling hash over UTF-16 code units (`h = h * 31 + unit`, wrapping).
///
/// This guards against accidental corruption only; it is not a cryptographic digest.
pub fn checksum(text: &str) -> String {
    let hash = text
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    format!("{:08x}", hash as u32)
}
