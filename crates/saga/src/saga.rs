//! Saga lifecycle engine.
//!
//! - Identity is bound at construction and checked against the saga type
//! - Every transition is recorded as a pending [`SagaEvent`]
//! - Terminal statuses are final: later transitions fail with `ChangeStateFailed`
//! - A failed call never partially applies (no event, no mutation)
//!
//! `now` is sampled with `Utc::now()` at each call that needs it.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};

use sagaflow_core::{
    ContentHash, ExpireRule, SagaError, SagaId, SagaOutcome, SagaResult, SagaStatus,
};
use sagaflow_events::{SagaClosed, SagaCreated, SagaEvent, SagaStatusChanged};

use crate::definition::SagaDefinition;
use crate::snapshot::{SagaSnapshot, SnapshotView};

/// One running instance of the saga type `D`.
///
/// # Single writer
///
/// The engine holds no locks. At most one handler may run against a given saga id at a
/// time; serializing access is the orchestrator's job.
pub struct Saga<D: SagaDefinition> {
    id: SagaId,
    status: SagaStatus,
    created_at: DateTime<Utc>,
    expiration_date: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    state: D::State,
    pending_events: Vec<SagaEvent>,
    _definition: PhantomData<fn() -> D>,
}

impl<D: SagaDefinition> Saga<D> {
    /// Create a saga that expires according to the type's metadata rule.
    pub fn new(id: SagaId, state: D::State) -> SagaResult<Self> {
        let now = Utc::now();
        let metadata = D::metadata()?;
        let expiration_date = metadata.expire_rule().resolve(now)?;
        Self::create(id, state, now, expiration_date)
    }

    /// Create a saga with an explicit expiration date.
    pub fn with_expiration(
        id: SagaId,
        state: D::State,
        expiration_date: DateTime<Utc>,
    ) -> SagaResult<Self> {
        Self::create(id, state, Utc::now(), expiration_date)
    }

    /// Create a saga whose expiration is a relative expression such as `"+2 days"`.
    pub fn with_expire_rule(id: SagaId, state: D::State, rule: &str) -> SagaResult<Self> {
        let now = Utc::now();
        let expiration_date = ExpireRule::parse(rule)?.resolve(now)?;
        Self::create(id, state, now, expiration_date)
    }

    fn create(
        id: SagaId,
        state: D::State,
        now: DateTime<Utc>,
        expiration_date: DateTime<Utc>,
    ) -> SagaResult<Self> {
        if id.owner_type() != D::SAGA_TYPE {
            return Err(SagaError::invalid_identifier(format!(
                "identifier `{id}` belongs to `{}`, expected `{}`",
                id.owner_type(),
                D::SAGA_TYPE
            )));
        }

        if expiration_date <= now {
            return Err(SagaError::InvalidExpireDateInterval);
        }

        let mut saga = Self {
            id,
            status: SagaStatus::Created,
            created_at: now,
            expiration_date,
            closed_at: None,
            state,
            pending_events: Vec::new(),
            _definition: PhantomData,
        };

        saga.raise(SagaEvent::Created(SagaCreated {
            id: saga.id.value().to_string(),
            id_owner_type: D::IDENTIFIER_TYPE.to_string(),
            saga_type: D::SAGA_TYPE.to_string(),
            datetime: now,
            expiration_date,
        }));

        tracing::debug!(
            saga_id = %saga.id,
            saga_type = D::SAGA_TYPE,
            expiration_date = %expiration_date,
            "saga created"
        );

        Ok(saga)
    }

    /// Rebuild a saga from persisted state. The event queue starts empty.
    ///
    /// Expiration is checked against the creation date, not against the current time: a
    /// saga loaded after its deadline is legitimate and must still be expirable.
    pub fn restore(snapshot: SagaSnapshot<D::State>) -> SagaResult<Self> {
        if snapshot.id.owner_type() != D::SAGA_TYPE {
            return Err(SagaError::invalid_identifier(format!(
                "stored identifier `{}` belongs to `{}`, expected `{}`",
                snapshot.id,
                snapshot.id.owner_type(),
                D::SAGA_TYPE
            )));
        }
        if snapshot.expiration_date <= snapshot.created_at {
            return Err(SagaError::InvalidExpireDateInterval);
        }
        if snapshot.closed_at.is_some() != snapshot.status.is_terminal() {
            return Err(SagaError::invalid_status(format!(
                "stored saga `{}` has status `{}` but closed_at is {:?}",
                snapshot.id, snapshot.status, snapshot.closed_at
            )));
        }

        Ok(Self {
            id: snapshot.id,
            status: snapshot.status,
            created_at: snapshot.created_at,
            expiration_date: snapshot.expiration_date,
            closed_at: snapshot.closed_at,
            state: snapshot.state,
            pending_events: Vec::new(),
            _definition: PhantomData,
        })
    }

    pub fn id(&self) -> &SagaId {
        &self.id
    }

    pub fn status(&self) -> SagaStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expiration_date(&self) -> DateTime<Utc> {
        self.expiration_date
    }

    /// Set once the saga reaches a terminal status.
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn state(&self) -> &D::State {
        &self.state
    }

    /// Mutable business state for handlers. Closed sagas are read-only.
    pub fn state_mut(&mut self) -> SagaResult<&mut D::State> {
        self.ensure_active()?;
        Ok(&mut self.state)
    }

    /// Events raised since the last drain, oldest first.
    pub fn pending_events(&self) -> &[SagaEvent] {
        &self.pending_events
    }

    /// True when the deadline has passed and the saga is still open.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && now > self.expiration_date
    }

    /// Move to `new_status`.
    ///
    /// Requesting the current status is a no-op. Requesting a terminal status closes the
    /// saga (same as [`Saga::close`]), so `closed_at` is always set alongside a terminal
    /// status.
    pub fn change_status(
        &mut self,
        new_status: SagaStatus,
        reason: Option<String>,
    ) -> SagaResult<()> {
        self.ensure_active()?;

        if new_status == self.status {
            return Ok(());
        }

        match SagaOutcome::try_from(new_status) {
            Ok(outcome) => self.close(outcome, reason),
            Err(_) => {
                self.transition(new_status, reason, Utc::now());
                Ok(())
            }
        }
    }

    /// Finish the saga with a terminal outcome.
    ///
    /// Raises `StatusChanged` followed by `Closed` and stamps `closed_at`.
    pub fn close(&mut self, outcome: SagaOutcome, reason: Option<String>) -> SagaResult<()> {
        self.ensure_active()?;

        let now = Utc::now();
        self.transition(outcome.into(), reason.clone(), now);

        self.raise(SagaEvent::Closed(SagaClosed {
            id: self.id.value().to_string(),
            id_owner_type: D::IDENTIFIER_TYPE.to_string(),
            saga_type: D::SAGA_TYPE.to_string(),
            datetime: now,
            reason,
        }));
        self.closed_at = Some(now);

        tracing::debug!(
            saga_id = %self.id,
            saga_type = D::SAGA_TYPE,
            status = %self.status,
            "saga closed"
        );

        Ok(())
    }

    pub fn mark_completed(&mut self) -> SagaResult<()> {
        self.close(SagaOutcome::Completed, None)
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> SagaResult<()> {
        self.close(SagaOutcome::Failed, Some(reason.into()))
    }

    pub fn mark_expired(&mut self, reason: impl Into<String>) -> SagaResult<()> {
        self.close(SagaOutcome::Expired, Some(reason.into()))
    }

    /// Take every pending event, oldest first, leaving the queue empty.
    pub fn drain_events(&mut self) -> Vec<SagaEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Digest of the persistable state (pending events excluded), recomputed on every call.
    pub fn content_hash(&self) -> SagaResult<ContentHash> {
        ContentHash::of(&self.view())
    }

    pub fn snapshot(&self) -> SagaSnapshot<D::State> {
        SagaSnapshot {
            id: self.id.clone(),
            status: self.status,
            created_at: self.created_at,
            expiration_date: self.expiration_date,
            closed_at: self.closed_at,
            state: self.state.clone(),
        }
    }

    fn view(&self) -> SnapshotView<'_, D::State> {
        SnapshotView {
            id: &self.id,
            status: self.status,
            created_at: self.created_at,
            expiration_date: self.expiration_date,
            closed_at: self.closed_at,
            state: &self.state,
        }
    }

    fn ensure_active(&self) -> SagaResult<()> {
        if self.status.is_terminal() {
            tracing::warn!(
                saga_id = %self.id,
                saga_type = D::SAGA_TYPE,
                status = %self.status,
                "transition rejected: saga is closed"
            );
            return Err(SagaError::ChangeStateFailed);
        }
        Ok(())
    }

    // Unguarded: callers check `ensure_active` first.
    fn transition(&mut self, new_status: SagaStatus, reason: Option<String>, now: DateTime<Utc>) {
        let previous_status = self.status;

        self.raise(SagaEvent::StatusChanged(SagaStatusChanged {
            id: self.id.value().to_string(),
            id_owner_type: D::IDENTIFIER_TYPE.to_string(),
            saga_type: D::SAGA_TYPE.to_string(),
            datetime: now,
            previous_status,
            new_status,
            reason,
        }));
        self.status = new_status;

        tracing::debug!(
            saga_id = %self.id,
            saga_type = D::SAGA_TYPE,
            from = %previous_status,
            to = %new_status,
            "saga status changed"
        );
    }

    fn raise(&mut self, event: SagaEvent) {
        self.pending_events.push(event);
    }
}

impl<D: SagaDefinition> Clone for Saga<D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            status: self.status,
            created_at: self.created_at,
            expiration_date: self.expiration_date,
            closed_at: self.closed_at,
            state: self.state.clone(),
            pending_events: self.pending_events.clone(),
            _definition: PhantomData,
        }
    }
}

impl<D: SagaDefinition> core::fmt::Debug for Saga<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Saga")
            .field("saga_type", &D::SAGA_TYPE)
            .field("id", &self.id)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("expiration_date", &self.expiration_date)
            .field("closed_at", &self.closed_at)
            .field("state", &self.state)
            .field("pending_events", &self.pending_events.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct TestState {
        counter: u32,
        tags: HashMap<String, String>,
    }

    struct TestSaga;

    impl SagaDefinition for TestSaga {
        type State = TestState;
        const SAGA_TYPE: &'static str = "saga.test";
        const ID_FIELD: &'static str = "request_id";
    }

    struct ShortLivedSaga;

    impl SagaDefinition for ShortLivedSaga {
        type State = ();
        const SAGA_TYPE: &'static str = "saga.short_lived";
        const ID_FIELD: &'static str = "request_id";
        const EXPIRE_RULE: &'static str = "-1 hour";
    }

    fn test_id() -> SagaId {
        TestSaga::id("123456789").unwrap()
    }

    fn new_saga() -> Saga<TestSaga> {
        Saga::new(test_id(), TestState::default()).unwrap()
    }

    #[test]
    fn construction_emits_created_event() {
        let saga = new_saga();

        assert_eq!(saga.status(), SagaStatus::Created);
        assert!(saga.closed_at().is_none());
        assert!(saga.expiration_date() > saga.created_at());
        assert_eq!(saga.expiration_date() - saga.created_at(), Duration::hours(1));

        assert_eq!(saga.pending_events().len(), 1);
        match &saga.pending_events()[0] {
            SagaEvent::Created(e) => {
                assert_eq!(e.id, "123456789");
                assert_eq!(e.id_owner_type, "saga_id");
                assert_eq!(e.saga_type, "saga.test");
                assert_eq!(e.datetime, saga.created_at());
                assert_eq!(e.expiration_date, saga.expiration_date());
            }
            other => panic!("Expected Created event, got {other:?}"),
        }
    }

    #[test]
    fn foreign_identifier_is_rejected() {
        let id = SagaId::new("123456789", "saga.other").unwrap();
        let err = Saga::<TestSaga>::new(id, TestState::default()).unwrap_err();
        assert!(matches!(err, SagaError::InvalidIdentifier(_)));
    }

    #[test]
    fn past_or_present_expiration_is_rejected() {
        let err = Saga::<TestSaga>::with_expiration(
            test_id(),
            TestState::default(),
            Utc::now() - Duration::hours(1),
        )
        .unwrap_err();
        assert_eq!(err, SagaError::InvalidExpireDateInterval);

        let err = Saga::<TestSaga>::with_expire_rule(test_id(), TestState::default(), "-1 hour")
            .unwrap_err();
        assert_eq!(err, SagaError::InvalidExpireDateInterval);

        let err = Saga::<TestSaga>::with_expire_rule(test_id(), TestState::default(), "now")
            .unwrap_err();
        assert_eq!(err, SagaError::InvalidExpireDateInterval);
    }

    #[test]
    fn default_rule_from_metadata_is_validated() {
        let id = ShortLivedSaga::id("1").unwrap();
        let err = Saga::<ShortLivedSaga>::new(id, ()).unwrap_err();
        assert_eq!(err, SagaError::InvalidExpireDateInterval);
    }

    #[test]
    fn malformed_override_rule_is_a_parse_error() {
        let err = Saga::<TestSaga>::with_expire_rule(test_id(), TestState::default(), "later")
            .unwrap_err();
        assert!(matches!(err, SagaError::InvalidExpireRule(_)));
    }

    #[test]
    fn override_rule_sets_expiration() {
        let saga =
            Saga::<TestSaga>::with_expire_rule(test_id(), TestState::default(), "+2 days").unwrap();
        assert_eq!(saga.expiration_date() - saga.created_at(), Duration::days(2));
    }

    #[test]
    fn change_status_emits_event_and_updates_status() {
        let mut saga = new_saga();
        saga.drain_events();

        saga.change_status(SagaStatus::InProgress, Some("started".to_string()))
            .unwrap();

        assert_eq!(saga.status(), SagaStatus::InProgress);
        let events = saga.drain_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            SagaEvent::StatusChanged(e) => {
                assert_eq!(e.previous_status, SagaStatus::Created);
                assert_eq!(e.new_status, SagaStatus::InProgress);
                assert_eq!(e.reason.as_deref(), Some("started"));
            }
            other => panic!("Expected StatusChanged event, got {other:?}"),
        }
    }

    #[test]
    fn redundant_change_status_is_a_no_op() {
        let mut saga = new_saga();
        saga.change_status(SagaStatus::Created, None).unwrap();
        assert_eq!(saga.pending_events().len(), 1);

        saga.change_status(SagaStatus::InProgress, None).unwrap();
        saga.change_status(SagaStatus::InProgress, None).unwrap();
        assert_eq!(saga.pending_events().len(), 2);
    }

    #[test]
    fn change_status_to_terminal_closes_the_saga() {
        let mut saga = new_saga();
        saga.change_status(SagaStatus::Failed, Some("boom".to_string()))
            .unwrap();

        assert_eq!(saga.status(), SagaStatus::Failed);
        assert!(saga.closed_at().is_some());
        let events = saga.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[2], SagaEvent::Closed(_)));
    }

    #[test]
    fn close_emits_status_changed_then_closed() {
        let mut saga = new_saga();
        saga.mark_completed().unwrap();

        assert_eq!(saga.status(), SagaStatus::Completed);
        let closed_at = saga.closed_at().expect("closed_at set on close");

        let events = saga.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], SagaEvent::Created(_)));
        match &events[1] {
            SagaEvent::StatusChanged(e) => {
                assert_eq!(e.previous_status, SagaStatus::Created);
                assert_eq!(e.new_status, SagaStatus::Completed);
                assert_eq!(e.reason, None);
            }
            other => panic!("Expected StatusChanged event, got {other:?}"),
        }
        match &events[2] {
            SagaEvent::Closed(e) => {
                assert_eq!(e.reason, None);
                assert_eq!(e.datetime, closed_at);
            }
            other => panic!("Expected Closed event, got {other:?}"),
        }
    }

    #[test]
    fn closed_saga_rejects_every_transition_without_side_effects() {
        let mut saga = new_saga();
        saga.mark_failed("boom").unwrap();

        let closed_at = saga.closed_at();
        let queued = saga.pending_events().len();

        let attempts: Vec<SagaResult<()>> = vec![
            saga.change_status(SagaStatus::InProgress, None),
            saga.change_status(SagaStatus::Failed, None),
            saga.mark_completed(),
            saga.mark_failed("again"),
            saga.mark_expired("late"),
            saga.close(SagaOutcome::Completed, None),
        ];
        for result in attempts {
            assert_eq!(result.unwrap_err(), SagaError::ChangeStateFailed);
        }
        assert_eq!(saga.state_mut().unwrap_err(), SagaError::ChangeStateFailed);

        assert_eq!(saga.status(), SagaStatus::Failed);
        assert_eq!(saga.closed_at(), closed_at);
        assert_eq!(saga.pending_events().len(), queued);
    }

    #[test]
    fn drain_empties_the_queue() {
        let mut saga = new_saga();
        saga.change_status(SagaStatus::InProgress, None).unwrap();

        let first = saga.drain_events();
        assert_eq!(first.len(), 2);
        assert!(matches!(first[0], SagaEvent::Created(_)));
        assert!(matches!(first[1], SagaEvent::StatusChanged(_)));

        assert!(saga.drain_events().is_empty());
        assert!(saga.pending_events().is_empty());
    }

    #[test]
    fn expiry_check_ignores_closed_sagas() {
        let mut saga = new_saga();
        let after_deadline = saga.expiration_date() + Duration::seconds(1);

        assert!(!saga.is_expired_at(saga.created_at()));
        assert!(saga.is_expired_at(after_deadline));

        saga.mark_expired("deadline passed").unwrap();
        assert_eq!(saga.status(), SagaStatus::Expired);
        assert!(!saga.is_expired_at(after_deadline));
    }

    #[test]
    fn content_hash_ignores_pending_events() {
        let mut saga = new_saga();
        let before = saga.content_hash().unwrap();
        saga.drain_events();
        assert_eq!(saga.content_hash().unwrap(), before);
    }

    #[test]
    fn content_hash_tracks_state_and_status() {
        let mut saga = new_saga();
        let initial = saga.content_hash().unwrap();

        saga.state_mut().unwrap().counter += 1;
        let after_state = saga.content_hash().unwrap();
        assert_ne!(after_state, initial);

        saga.change_status(SagaStatus::InProgress, None).unwrap();
        assert_ne!(saga.content_hash().unwrap(), after_state);
    }

    #[test]
    fn content_hash_matches_snapshot_hash() {
        let mut saga = new_saga();
        saga.state_mut()
            .unwrap()
            .tags
            .insert("region".to_string(), "eu".to_string());

        assert_eq!(
            saga.content_hash().unwrap(),
            saga.snapshot().content_hash().unwrap()
        );
    }

    #[test]
    fn restore_round_trips_state_and_hash() {
        let mut saga = new_saga();
        saga.change_status(SagaStatus::InProgress, None).unwrap();
        saga.state_mut().unwrap().counter = 7;

        let restored = Saga::<TestSaga>::restore(saga.snapshot()).unwrap();
        assert_eq!(restored.id(), saga.id());
        assert_eq!(restored.status(), SagaStatus::InProgress);
        assert_eq!(restored.state(), saga.state());
        assert!(restored.pending_events().is_empty());
        assert_eq!(restored.content_hash().unwrap(), saga.content_hash().unwrap());
    }

    #[test]
    fn restore_accepts_sagas_past_their_deadline() {
        let saga = new_saga();
        let mut snapshot = saga.snapshot();
        snapshot.created_at = Utc::now() - Duration::hours(3);
        snapshot.expiration_date = Utc::now() - Duration::hours(2);

        let mut restored = Saga::<TestSaga>::restore(snapshot).unwrap();
        assert!(restored.is_expired_at(Utc::now()));
        restored.mark_expired("deadline passed").unwrap();
    }

    #[test]
    fn restore_rejects_inconsistent_snapshots() {
        let saga = new_saga();

        let mut foreign = saga.snapshot();
        foreign.id = SagaId::new("123456789", "saga.other").unwrap();
        assert!(matches!(
            Saga::<TestSaga>::restore(foreign).unwrap_err(),
            SagaError::InvalidIdentifier(_)
        ));

        let mut inverted = saga.snapshot();
        inverted.expiration_date = inverted.created_at;
        assert_eq!(
            Saga::<TestSaga>::restore(inverted).unwrap_err(),
            SagaError::InvalidExpireDateInterval
        );

        let mut terminal_without_close = saga.snapshot();
        terminal_without_close.status = SagaStatus::Completed;
        assert!(matches!(
            Saga::<TestSaga>::restore(terminal_without_close).unwrap_err(),
            SagaError::InvalidStatus(_)
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: business state built in any insertion order hashes the same.
        #[test]
        fn hash_is_independent_of_insertion_order(
            tags in prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..12),
            counter in any::<u32>()
        ) {
            let saga = new_saga();

            let mut forward = saga.clone();
            let mut reversed = saga.clone();
            {
                let state = forward.state_mut().unwrap();
                state.counter = counter;
                for (k, v) in tags.iter() {
                    state.tags.insert(k.clone(), v.clone());
                }
            }
            {
                let state = reversed.state_mut().unwrap();
                for (k, v) in tags.iter().rev() {
                    state.tags.insert(k.clone(), v.clone());
                }
                state.counter = counter;
            }

            prop_assert_eq!(forward.content_hash().unwrap(), reversed.content_hash().unwrap());
        }

        /// Property: any transition after close fails and leaves the saga untouched.
        #[test]
        fn transitions_after_close_are_rejected(
            outcome_idx in 0usize..3,
            target_idx in 0usize..5
        ) {
            let outcomes = [SagaOutcome::Completed, SagaOutcome::Failed, SagaOutcome::Expired];
            let mut saga = new_saga();
            saga.close(outcomes[outcome_idx], None).unwrap();

            let hash = saga.content_hash().unwrap();
            let queued = saga.pending_events().len();

            let err = saga.change_status(SagaStatus::ALL[target_idx], None).unwrap_err();
            prop_assert_eq!(err, SagaError::ChangeStateFailed);
            prop_assert_eq!(saga.pending_events().len(), queued);
            prop_assert_eq!(saga.content_hash().unwrap(), hash);
        }
    }
}
