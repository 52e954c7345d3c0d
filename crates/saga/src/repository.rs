//! Saga persistence contract and an in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use sagaflow_core::{ContentHash, ExpectedHash, SagaError, SagaId, SagaResult};

use crate::definition::SagaDefinition;
use crate::saga::Saga;
use crate::snapshot::SagaSnapshot;

/// Result of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The snapshot was stored; carries the new content hash.
    Written(ContentHash),
    /// The stored snapshot already had this hash; nothing was written.
    Unchanged(ContentHash),
}

impl SaveOutcome {
    pub fn hash(&self) -> &ContentHash {
        match self {
            SaveOutcome::Written(hash) | SaveOutcome::Unchanged(hash) => hash,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, SaveOutcome::Written(_))
    }
}

/// Loads and stores saga state.
///
/// Implementations own the single-writer guarantee: a saga returned by `load` must not
/// be handed to two handlers at once. `save` compares content hashes so unchanged sagas
/// are not rewritten, and checks `expected` for optimistic concurrency.
///
/// Pending events are not persisted; drain them before (or after) saving.
pub trait SagaRepository<D: SagaDefinition>: Send + Sync {
    fn load(&self, id: &SagaId) -> SagaResult<Option<Saga<D>>>;

    fn save(&self, saga: &Saga<D>, expected: ExpectedHash) -> SagaResult<SaveOutcome>;
}

struct StoredSaga<S> {
    snapshot: SagaSnapshot<S>,
    hash: ContentHash,
}

/// In-memory saga store.
///
/// Intended for tests/dev. Not optimized for performance.
pub struct InMemorySagaRepository<D: SagaDefinition> {
    sagas: RwLock<HashMap<SagaId, StoredSaga<D::State>>>,
}

impl<D: SagaDefinition> InMemorySagaRepository<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content hash of the stored snapshot, if any.
    pub fn stored_hash(&self, id: &SagaId) -> SagaResult<Option<ContentHash>> {
        let sagas = self.sagas.read().map_err(|_| poisoned())?;
        Ok(sagas.get(id).map(|stored| stored.hash.clone()))
    }

    /// Drop a saga (e.g. once it is closed and its events are dispatched).
    pub fn remove(&self, id: &SagaId) -> SagaResult<bool> {
        let mut sagas = self.sagas.write().map_err(|_| poisoned())?;
        Ok(sagas.remove(id).is_some())
    }

    pub fn len(&self) -> SagaResult<usize> {
        let sagas = self.sagas.read().map_err(|_| poisoned())?;
        Ok(sagas.len())
    }

    pub fn is_empty(&self) -> SagaResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl<D: SagaDefinition> Default for InMemorySagaRepository<D> {
    fn default() -> Self {
        Self {
            sagas: RwLock::new(HashMap::new()),
        }
    }
}

impl<D: SagaDefinition> SagaRepository<D> for InMemorySagaRepository<D> {
    fn load(&self, id: &SagaId) -> SagaResult<Option<Saga<D>>> {
        let sagas = self.sagas.read().map_err(|_| poisoned())?;
        match sagas.get(id) {
            Some(stored) => Saga::restore(stored.snapshot.clone()).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, saga: &Saga<D>, expected: ExpectedHash) -> SagaResult<SaveOutcome> {
        let hash = saga.content_hash()?;

        let mut sagas = self.sagas.write().map_err(|_| poisoned())?;
        let current = sagas.get(saga.id()).map(|stored| &stored.hash);
        expected.check(current)?;

        if current == Some(&hash) {
            tracing::trace!(saga_id = %saga.id(), saga_type = D::SAGA_TYPE, "saga unchanged, write skipped");
            return Ok(SaveOutcome::Unchanged(hash));
        }

        sagas.insert(
            saga.id().clone(),
            StoredSaga {
                snapshot: saga.snapshot(),
                hash: hash.clone(),
            },
        );
        tracing::trace!(saga_id = %saga.id(), saga_type = D::SAGA_TYPE, %hash, "saga stored");

        Ok(SaveOutcome::Written(hash))
    }
}

fn poisoned() -> SagaError {
    SagaError::store_unavailable("saga store lock poisoned")
}
