//! Feature Canonicalizer - stable content identity for feature sets
//!
//! A named set of numeric features is serialized with its names sorted, so
//! the order in which the set was built never changes the result. Values are
//! written as-is (shortest round-trip decimal), without rounding: two sets
//! are equal iff every value is bit-for-bit the same number.
//!
//! The fingerprint is a SHA-256 of that encoding and is only ever used as a
//! cache key.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::models::FeatureRecord;

/// Fixed-length identity of a canonical feature set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Name-sorted feature values plus their serialized bytes
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalForm {
    fields: BTreeMap<String, f64>,
    encoded: String,
}

impl CanonicalForm {
    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Deterministic serialization, e.g. `{"Age":35,"Balance":50000}`
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Canonicalize an arbitrary named feature set.
///
/// If a name appears twice the later value wins.
pub fn canonicalize_fields<I, K>(fields: I) -> (Fingerprint, CanonicalForm)
where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
{
    let fields: BTreeMap<String, f64> = fields
        .into_iter()
        .map(|(name, value)| (name.into(), value))
        .collect();

    let encoded = encode(&fields);
    let digest = Sha256::digest(encoded.as_bytes());
    let fingerprint = Fingerprint(digest.into());

    (fingerprint, CanonicalForm { fields, encoded })
}

/// Canonicalize a validated customer record
pub fn canonicalize(record: &FeatureRecord) -> (Fingerprint, CanonicalForm) {
    canonicalize_fields(record.named_values())
}

fn encode(fields: &BTreeMap<String, f64>) -> String {
    let mut out = String::with_capacity(fields.len() * 24 + 2);
    out.push('{');
    for (i, (name, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        // Writing into a String cannot fail
        let _ = write!(out, "{:?}:{}", name, value);
    }
    out.push('}');
    out
}
