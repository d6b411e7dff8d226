//! Storage trait definition

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::DomainError;

use super::entity::{ListOptions, StorageEntity};

/// Generic record storage: keyed read, insert, partial update and ordered listing
#[async_trait]
pub trait Storage<E>: Send + Sync + Debug
where
    E: StorageEntity + 'static,
{
    /// Retrieves an entity by its key
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError>;

    /// Retrieves entities, optionally ordered and limited
    async fn list(&self, options: ListOptions) -> Result<Vec<E>, DomainError>;

    /// Inserts a new entity, returns error if it already exists
    async fn create(&self, entity: E) -> Result<E, DomainError>;

    /// Merges the top-level fields of `changes` into the stored entity and
    /// returns the updated entity. Fails with NotFound if the key is absent.
    async fn patch(&self, key: &E::Key, changes: Value) -> Result<E, DomainError>;

    /// Checks if an entity exists by its key
    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Reachability check used by readiness
    async fn ping(&self) -> Result<(), DomainError> {
        self.list(ListOptions::default().with_limit(1)).await.map(|_| ())
    }
}

/// Apply a top-level JSON merge of `changes` onto `entity`
pub fn merge_patch<E: StorageEntity>(entity: &E, changes: &Value) -> Result<E, DomainError> {
    let mut current = serde_json::to_value(entity)
        .map_err(|e| DomainError::storage(format!("Failed to serialize entity: {}", e)))?;

    let (Some(target), Some(fields)) = (current.as_object_mut(), changes.as_object()) else {
        return Err(DomainError::storage("Patch requires JSON objects"));
    };

    for (field, value) in fields {
        target.insert(field.clone(), value.clone());
    }

    serde_json::from_value(current)
        .map_err(|e| DomainError::storage(format!("Failed to deserialize entity: {}", e)))
}
