//! `sagaflow-saga` — the saga lifecycle engine.
//!
//! A concrete saga is a [`SagaDefinition`] (type name, metadata, business state) driven by
//! the generic [`Saga`] engine. Business handlers live in an extension trait implemented
//! for `Saga<YourDefinition>`; they mutate state and call the transition primitives.
//!
//! The engine carries no synchronization. Callers must guarantee at most one in-flight
//! mutation per saga identifier (per-id lock, actor mailbox, or optimistic retries using
//! [`sagaflow_core::ExpectedHash`]).

pub mod definition;
pub mod registry;
pub mod repository;
pub mod saga;
pub mod snapshot;

pub use definition::SagaDefinition;
pub use registry::MetadataRegistry;
pub use repository::{InMemorySagaRepository, SagaRepository, SaveOutcome};
pub use saga::Saga;
pub use snapshot::SagaSnapshot;
