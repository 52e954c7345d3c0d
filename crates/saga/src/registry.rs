//! Registration-time catalogue of saga metadata.
//!
//! Routers consult it to know which inbound field carries a saga's id. The registry only
//! stores descriptors; extracting ids from messages is the router's business.

use std::collections::BTreeMap;

use sagaflow_core::{SagaError, SagaMetadata, SagaResult};

use crate::definition::SagaDefinition;

#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entries: BTreeMap<String, SagaMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<D: SagaDefinition>(&mut self) -> SagaResult<&SagaMetadata> {
        self.insert(D::metadata()?)
    }

    /// Add a prebuilt descriptor. Each saga type may be registered once.
    pub fn insert(&mut self, metadata: SagaMetadata) -> SagaResult<&SagaMetadata> {
        let saga_type = metadata.saga_type().to_string();
        if self.entries.contains_key(&saga_type) {
            return Err(SagaError::invalid_metadata(format!(
                "saga type `{saga_type}` is already registered"
            )));
        }

        tracing::debug!(
            saga_type = %saga_type,
            id_field = metadata.id_field(),
            expire_rule = %metadata.expire_rule(),
            "saga type registered"
        );

        Ok(&*self.entries.entry(saga_type).or_insert(metadata))
    }

    pub fn get(&self, saga_type: &str) -> Option<&SagaMetadata> {
        self.entries.get(saga_type)
    }

    pub fn id_field(&self, saga_type: &str) -> Option<&str> {
        self.get(saga_type).map(SagaMetadata::id_field)
    }

    /// Registered descriptors, ordered by saga type.
    pub fn iter(&self) -> impl Iterator<Item = &SagaMetadata> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
