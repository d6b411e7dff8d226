//! Storage-backed workflow repository implementation

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::storage::{ListOptions, Storage};
use crate::domain::workflow::{Workflow, WorkflowId, WorkflowRepository};
use crate::domain::DomainError;

/// Storage-backed implementation of WorkflowRepository
#[derive(Debug)]
pub struct StorageWorkflowRepository {
    storage: Arc<dyn Storage<Workflow>>,
}

impl StorageWorkflowRepository {
    pub fn new(storage: Arc<dyn Storage<Workflow>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl WorkflowRepository for StorageWorkflowRepository {
    async fn get(&self, id: &WorkflowId) -> Result<Option<Workflow>, DomainError> {
        self.storage.get(id).await
    }

    async fn create(&self, workflow: Workflow) -> Result<Workflow, DomainError> {
        workflow.validate()?;
        self.storage.create(workflow).await
    }

    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Workflow>, DomainError> {
        let mut options = ListOptions::newest_first();
        options.limit = limit;
        self.storage.list(options).await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.storage.ping().await
    }
}
