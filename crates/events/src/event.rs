use chrono::{DateTime, Utc};

/// A fact emitted by a saga transition.
///
/// Saga events are immutable and versioned. The dispatcher that delivers them only needs
/// the stable type name and the saga they belong to for routing.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "saga.status_changed").
    fn event_type(&self) -> &'static str;

    /// Payload schema version.
    fn version(&self) -> u32;

    /// Saga type that emitted the event.
    fn saga_type(&self) -> &str;

    /// When the transition happened.
    fn occurred_at(&self) -> DateTime<Utc>;
}
