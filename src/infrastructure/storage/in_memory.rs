//! In-memory storage implementation

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::storage::{merge_patch, ListOptions, Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

#[derive(Debug)]
struct Slot<E> {
    seq: u64,
    entity: E,
}

#[derive(Debug)]
struct Inner<E> {
    next_seq: u64,
    slots: HashMap<String, Slot<E>>,
}

/// Thread-safe in-memory storage implementation
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryStorage<E>
where
    E: StorageEntity,
{
    inner: RwLock<Inner<E>>,
}

impl<E> Default for InMemoryStorage<E>
where
    E: StorageEntity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryStorage<E>
where
    E: StorageEntity,
{
    /// Creates a new empty in-memory storage
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_seq: 0,
                slots: HashMap::new(),
            }),
        }
    }
}

#[async_trait]
impl<E> Storage<E> for InMemoryStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        let inner = self.inner.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(inner.slots.get(key.as_str()).map(|slot| slot.entity.clone()))
    }

    async fn list(&self, options: ListOptions) -> Result<Vec<E>, DomainError> {
        let inner = self.inner.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut slots: Vec<&Slot<E>> = inner.slots.values().collect();
        slots.sort_by_key(|slot| (slot.entity.created_at(), slot.seq));
        if options.newest_first {
            slots.reverse();
        }

        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(slots
            .into_iter()
            .take(limit)
            .map(|slot| slot.entity.clone())
            .collect())
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut inner = self.inner.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        if inner.slots.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "Entity with key '{}' already exists",
                key
            )));
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.slots.insert(
            key,
            Slot {
                seq,
                entity: entity.clone(),
            },
        );
        Ok(entity)
    }

    async fn patch(&self, key: &E::Key, changes: Value) -> Result<E, DomainError> {
        let mut inner = self.inner.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let slot = inner.slots.get_mut(key.as_str()).ok_or_else(|| {
            DomainError::not_found(format!("Entity with key '{}' not found", key.as_str()))
        })?;

        let updated = merge_patch(&slot.entity, &changes)?;
        slot.entity = updated.clone();
        Ok(updated)
    }

    async fn exists(&self, key: &E::Key) -> Result<bool, DomainError> {
        let inner = self.inner.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(inner.slots.contains_key(key.as_str()))
    }
}
