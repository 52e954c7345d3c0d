//! Saga type contract.

use serde::{Serialize, de::DeserializeOwned};

use sagaflow_core::{DEFAULT_EXPIRE_RULE, SagaId, SagaMetadata, SagaResult};

/// Static description of a concrete saga type.
///
/// Implementors define:
/// - a stable type name that every identifier of this saga must carry
/// - the inbound message field routers read the saga id from
/// - the default expiration rule
/// - a typed business state (serde, so it can be persisted and hashed)
///
/// Handlers are not part of this trait. Put them in an extension trait implemented for
/// `Saga<YourDefinition>` and have them call `change_status` / `close`:
///
/// ```ignore
/// trait FulfilmentHandlers {
///     fn payment_captured(&mut self) -> SagaResult<()>;
/// }
///
/// impl FulfilmentHandlers for Saga<OrderFulfilment> {
///     fn payment_captured(&mut self) -> SagaResult<()> {
///         self.state_mut()?.payment_captured = true;
///         self.mark_completed()
///     }
/// }
/// ```
pub trait SagaDefinition: Send + Sync + 'static {
    /// Business fields of the saga.
    type State: Clone + core::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Stable saga type identifier (e.g. "saga.order_fulfilment").
    const SAGA_TYPE: &'static str;

    /// Type name of the identifier, reported as `id_owner_type` in events.
    const IDENTIFIER_TYPE: &'static str = "saga_id";

    /// Inbound message field carrying the saga id.
    const ID_FIELD: &'static str;

    const EXPIRE_RULE: &'static str = DEFAULT_EXPIRE_RULE;

    fn metadata() -> SagaResult<SagaMetadata> {
        SagaMetadata::new(
            Self::SAGA_TYPE,
            Self::IDENTIFIER_TYPE,
            Self::ID_FIELD,
            Self::EXPIRE_RULE,
        )
    }

    /// Build an identifier owned by this saga type.
    fn id(value: impl Into<String>) -> SagaResult<SagaId> {
        SagaId::new(value, Self::SAGA_TYPE)
    }
}
