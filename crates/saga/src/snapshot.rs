//! Persistable saga state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sagaflow_core::{ContentHash, SagaId, SagaResult, SagaStatus};

/// Everything a repository stores for one saga instance.
///
/// Pending events are deliberately absent: they belong to the dispatcher once drained
/// and never take part in change detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaSnapshot<S> {
    pub id: SagaId,
    pub status: SagaStatus,
    pub created_at: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: S,
}

impl<S: Serialize> SagaSnapshot<S> {
    pub fn content_hash(&self) -> SagaResult<ContentHash> {
        ContentHash::of(&self.view())
    }

    pub(crate) fn view(&self) -> SnapshotView<'_, S> {
        SnapshotView {
            id: &self.id,
            status: self.status,
            created_at: self.created_at,
            expiration_date: self.expiration_date,
            closed_at: self.closed_at,
            state: &self.state,
        }
    }
}

/// Borrowed form of [`SagaSnapshot`]; serializes identically without cloning the state.
#[derive(Serialize)]
pub(crate) struct SnapshotView<'a, S> {
    pub id: &'a SagaId,
    pub status: SagaStatus,
    pub created_at: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: &'a S,
}
