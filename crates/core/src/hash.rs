//! Deterministic content hashing for change detection and optimistic concurrency.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

use crate::error::{SagaError, SagaResult};

/// SHA-256 digest over the canonical encoding of a value, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash any serializable value.
    ///
    /// The value is encoded through [`canonical_json`], so object key order (including
    /// `HashMap` iteration order) never affects the digest.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> SagaResult<Self> {
        let bytes = canonical_json(value)?;
        Ok(Self(hex::encode(Sha256::digest(&bytes))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a value as JSON with object keys written in sorted order.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> SagaResult<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    let mut out = Vec::new();
    write_canonical(&value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &JsonValue, out: &mut Vec<u8>) -> SagaResult<()> {
    match value {
        JsonValue::Object(map) => {
            let mut entries: Vec<(&String, &JsonValue)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push(b'{');
            for (idx, (key, field)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(field, out)?;
            }
            out.push(b'}');
        }
        JsonValue::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}

/// Optimistic concurrency expectation for a stored saga.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedHash {
    /// Skip the check (first write, migrations, etc.).
    Any,
    /// Require that nothing is stored yet.
    Absent,
    /// Require the stored snapshot to hash to exactly this value.
    Exact(ContentHash),
}

impl ExpectedHash {
    pub fn matches(&self, actual: Option<&ContentHash>) -> bool {
        match self {
            ExpectedHash::Any => true,
            ExpectedHash::Absent => actual.is_none(),
            ExpectedHash::Exact(expected) => actual == Some(expected),
        }
    }

    pub fn check(&self, actual: Option<&ContentHash>) -> SagaResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(SagaError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}
