//! `sagaflow-core` — saga building blocks.
//!
//! Identifiers, statuses, per-type metadata, relative-time expiration rules and content
//! hashing. Everything here is a pure value: no IO, no clocks, no shared state.

pub mod error;
pub mod expire;
pub mod hash;
pub mod id;
pub mod metadata;
pub mod status;
pub mod value_object;

pub use error::{SagaError, SagaResult};
pub use expire::{DEFAULT_EXPIRE_RULE, ExpireRule};
pub use hash::{ContentHash, ExpectedHash, canonical_json};
pub use id::SagaId;
pub use metadata::SagaMetadata;
pub use status::{SagaOutcome, SagaStatus};
pub use value_object::ValueObject;
