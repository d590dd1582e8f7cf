// src/fingerprint.rs
//! Stable content identity for price records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::record::PriceRecord;

// ASCII unit separator; keeps ("ab","c") and ("a","bc") apart.
const FIELD_SEP: u8 = 0x1f;

/// Hex-encoded SHA-256 over the identity fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes `(observation_date_text, source_name, price, vendor, specification)`.
/// `raw_label`, the parsed date and `is_new` do not take part.
pub fn fingerprint(record: &PriceRecord) -> Fingerprint {
    let mut hasher = Sha256::new();
    for field in [
        &record.observation_date_text,
        &record.source_name,
        &record.price,
        &record.vendor,
        &record.specification,
    ] {
        hasher.update(field.as_bytes());
        hasher.update([FIELD_SEP]);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    Fingerprint(out)
}
