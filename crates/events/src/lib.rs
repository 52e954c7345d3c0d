//! `sagaflow-events` — the facts a saga emits.
//!
//! Every saga transition is observable only through these events; the external
//! dispatcher delivers them after the orchestrator drains a saga's queue.

pub mod event;
pub mod lifecycle;

pub use event::Event;
pub use lifecycle::{SagaClosed, SagaCreated, SagaEvent, SagaStatusChanged};
