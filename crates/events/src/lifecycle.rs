//! Saga lifecycle events.
//!
//! Payload field names are wire-visible and must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sagaflow_core::SagaStatus;

use crate::Event;

/// Event: a saga instance was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SagaCreated {
    pub id: String,
    /// Type name of the identifier (from the saga's metadata).
    pub id_owner_type: String,
    pub saga_type: String,
    pub datetime: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
}

/// Event: a saga moved from one status to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SagaStatusChanged {
    pub id: String,
    pub id_owner_type: String,
    pub saga_type: String,
    pub datetime: DateTime<Utc>,
    pub previous_status: SagaStatus,
    pub new_status: SagaStatus,
    pub reason: Option<String>,
}

/// Event: a saga reached its terminal status and was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SagaClosed {
    pub id: String,
    pub id_owner_type: String,
    pub saga_type: String,
    pub datetime: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum SagaEvent {
    #[serde(rename = "saga.created")]
    Created(SagaCreated),
    #[serde(rename = "saga.status_changed")]
    StatusChanged(SagaStatusChanged),
    #[serde(rename = "saga.closed")]
    Closed(SagaClosed),
}

impl SagaEvent {
    /// Raw id value of the saga that emitted the event.
    pub fn saga_id(&self) -> &str {
        match self {
            SagaEvent::Created(e) => &e.id,
            SagaEvent::StatusChanged(e) => &e.id,
            SagaEvent::Closed(e) => &e.id,
        }
    }

    pub fn id_owner_type(&self) -> &str {
        match self {
            SagaEvent::Created(e) => &e.id_owner_type,
            SagaEvent::StatusChanged(e) => &e.id_owner_type,
            SagaEvent::Closed(e) => &e.id_owner_type,
        }
    }
}

impl Event for SagaEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::Created(_) => "saga.created",
            SagaEvent::StatusChanged(_) => "saga.status_changed",
            SagaEvent::Closed(_) => "saga.closed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn saga_type(&self) -> &str {
        match self {
            SagaEvent::Created(e) => &e.saga_type,
            SagaEvent::StatusChanged(e) => &e.saga_type,
            SagaEvent::Closed(e) => &e.saga_type,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SagaEvent::Created(e) => e.datetime,
            SagaEvent::StatusChanged(e) => e.datetime,
            SagaEvent::Closed(e) => e.datetime,
        }
    }
}
