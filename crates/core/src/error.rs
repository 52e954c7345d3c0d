//! Saga error model.

use thiserror::Error;

/// Result type used across the saga layer.
pub type SagaResult<T> = Result<T, SagaError>;

/// Saga-level error.
///
/// Every failure is raised synchronously at the point of violation. A transition that
/// fails leaves the saga untouched: no event is queued and no field is mutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SagaError {
    /// The identifier is malformed or belongs to another saga type.
    #[error("invalid saga identifier: {0}")]
    InvalidIdentifier(String),

    /// The resolved expiration date is not strictly after the creation date.
    #[error("the expiration date of the saga can not be less than the current date")]
    InvalidExpireDateInterval,

    /// A transition was attempted after the saga reached a terminal status.
    ///
    /// Orchestrators should treat this as "already closed" and not retry.
    #[error("changing the state of the saga is impossible: the saga is complete")]
    ChangeStateFailed,

    /// A status name outside the canonical set.
    #[error("invalid saga status: {0}")]
    InvalidStatus(String),

    /// A relative-time expression that does not parse or overflows.
    #[error("invalid expire rule: {0}")]
    InvalidExpireRule(String),

    /// A saga metadata descriptor failed validation.
    #[error("invalid saga metadata: {0}")]
    InvalidMetadata(String),

    /// Saga state could not be encoded for hashing or persistence.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A stored saga changed since it was loaded (optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The saga store can no longer be used (e.g. a poisoned lock). Not retriable.
    #[error("saga store unavailable: {0}")]
    StoreUnavailable(String),
}

impl SagaError {
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifier(msg.into())
    }

    pub fn invalid_status(msg: impl Into<String>) -> Self {
        Self::InvalidStatus(msg.into())
    }

    pub fn invalid_expire_rule(msg: impl Into<String>) -> Self {
        Self::InvalidExpireRule(msg.into())
    }

    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }
}

impl From<serde_json::Error> for SagaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
