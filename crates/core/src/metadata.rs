//! Static per-saga-type descriptor consumed by message routers.

use serde::{Deserialize, Serialize};

use crate::error::{SagaError, SagaResult};
use crate::expire::{DEFAULT_EXPIRE_RULE, ExpireRule};
use crate::value_object::ValueObject;

/// Registration-time description of a saga type.
///
/// Routers use `id_field` to find the saga identifier on an inbound message and the
/// expire rule to compute a default deadline. Saga instances never mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSagaMetadata")]
pub struct SagaMetadata {
    saga_type: String,
    identifier_type: String,
    id_field: String,
    expire_rule: ExpireRule,
}

#[derive(Deserialize)]
struct RawSagaMetadata {
    saga_type: String,
    identifier_type: String,
    id_field: String,
    expire_rule: String,
}

impl TryFrom<RawSagaMetadata> for SagaMetadata {
    type Error = SagaError;

    fn try_from(raw: RawSagaMetadata) -> Result<Self, Self::Error> {
        Self::new(raw.saga_type, raw.identifier_type, raw.id_field, raw.expire_rule)
    }
}

impl SagaMetadata {
    pub fn new(
        saga_type: impl Into<String>,
        identifier_type: impl Into<String>,
        id_field: impl Into<String>,
        expire_rule: impl AsRef<str>,
    ) -> SagaResult<Self> {
        let saga_type = non_empty("saga_type", saga_type.into())?;
        let identifier_type = non_empty("identifier_type", identifier_type.into())?;
        let id_field = non_empty("id_field", id_field.into())?;

        let expire_rule = expire_rule.as_ref();
        if expire_rule.trim().is_empty() {
            return Err(SagaError::invalid_metadata(format!(
                "`expire_rule` of saga `{saga_type}` must not be empty"
            )));
        }
        let expire_rule = ExpireRule::parse(expire_rule).map_err(|err| {
            SagaError::invalid_metadata(format!("saga `{saga_type}`: {err}"))
        })?;

        Ok(Self {
            saga_type,
            identifier_type,
            id_field,
            expire_rule,
        })
    }

    pub fn with_default_expiration(
        saga_type: impl Into<String>,
        identifier_type: impl Into<String>,
        id_field: impl Into<String>,
    ) -> SagaResult<Self> {
        Self::new(saga_type, identifier_type, id_field, DEFAULT_EXPIRE_RULE)
    }

    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    pub fn identifier_type(&self) -> &str {
        &self.identifier_type
    }

    /// Name of the inbound message field that carries the saga id.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn expire_rule(&self) -> &ExpireRule {
        &self.expire_rule
    }
}

impl ValueObject for SagaMetadata {}

fn non_empty(field: &str, value: String) -> SagaResult<String> {
    if value.trim().is_empty() {
        return Err(SagaError::invalid_metadata(format!("`{field}` must not be empty")));
    }
    Ok(value)
}
