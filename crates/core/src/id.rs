//! Saga instance identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SagaError, SagaResult};
use crate::value_object::ValueObject;

/// Identifier of a saga instance.
///
/// Pairs an opaque instance id with the saga type that owns it. Two identifiers are equal
/// only when both the value and the owner type match, so the same raw id used by two
/// different saga types never collides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSagaId")]
pub struct SagaId {
    value: String,
    owner_type: String,
}

#[derive(Deserialize)]
struct RawSagaId {
    value: String,
    owner_type: String,
}

impl TryFrom<RawSagaId> for SagaId {
    type Error = SagaError;

    fn try_from(raw: RawSagaId) -> Result<Self, Self::Error> {
        Self::new(raw.value, raw.owner_type)
    }
}

impl SagaId {
    /// Create an identifier, rejecting an empty value or owner type.
    pub fn new(value: impl Into<String>, owner_type: impl Into<String>) -> SagaResult<Self> {
        let value = value.into();
        let owner_type = owner_type.into();

        if value.trim().is_empty() {
            return Err(SagaError::invalid_identifier(format!(
                "empty id value for saga type `{owner_type}`"
            )));
        }
        if owner_type.trim().is_empty() {
            return Err(SagaError::invalid_identifier(format!(
                "empty owner type for id `{value}`"
            )));
        }

        Ok(Self { value, owner_type })
    }

    /// Create an identifier with a fresh UUIDv7 (time-ordered) value.
    ///
    /// Prefer passing ids explicitly in tests for determinism.
    pub fn generate(owner_type: impl Into<String>) -> SagaResult<Self> {
        Self::new(Uuid::now_v7().to_string(), owner_type)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Saga type this identifier belongs to.
    pub fn owner_type(&self) -> &str {
        &self.owner_type
    }
}

impl ValueObject for SagaId {}

impl core::fmt::Display for SagaId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.value)
    }
}
