//! Storage-backed run repository implementation

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::run::{Run, RunId, RunRepository, RunUpdate};
use crate::domain::storage::{ListOptions, Storage};
use crate::domain::DomainError;

/// Storage-backed implementation of RunRepository
///
/// Updates are checked against the stored record before the partial write,
/// so a run never leaves a terminal state or rewinds its step index.
#[derive(Debug)]
pub struct StorageRunRepository {
    storage: Arc<dyn Storage<Run>>,
}

impl StorageRunRepository {
    pub fn new(storage: Arc<dyn Storage<Run>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl RunRepository for StorageRunRepository {
    async fn get(&self, id: &RunId) -> Result<Option<Run>, DomainError> {
        self.storage.get(id).await
    }

    async fn create(&self, run: Run) -> Result<Run, DomainError> {
        self.storage.create(run).await
    }

    async fn update(&self, id: &RunId, update: RunUpdate) -> Result<Run, DomainError> {
        let current = self
            .storage
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Run '{}' not found", id)))?;

        current.check_update(&update)?;
        self.storage.patch(id, update.to_patch()).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Run>, DomainError> {
        self.storage
            .list(ListOptions::newest_first().with_limit(limit))
            .await
    }
}
