//! Application state for shared services

use std::sync::Arc;

use crate::domain::{DomainError, Run, RunHistoryEntry, Workflow};
use crate::infrastructure::services::{CreateWorkflowRequest, RunService, WorkflowService};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub workflow_service: Arc<dyn WorkflowServiceTrait>,
    pub run_service: Arc<dyn RunServiceTrait>,
}

/// Trait for workflow service operations
#[async_trait::async_trait]
pub trait WorkflowServiceTrait: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Workflow>, DomainError>;
    async fn list(&self) -> Result<Vec<Workflow>, DomainError>;
    async fn create(&self, request: CreateWorkflowRequest) -> Result<Workflow, DomainError>;
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Trait for run service operations
#[async_trait::async_trait]
pub trait RunServiceTrait: Send + Sync {
    async fn trigger(&self, workflow_id: &str) -> Result<Run, DomainError>;
    async fn get(&self, id: &str) -> Result<Option<Run>, DomainError>;
    async fn list_recent(&self) -> Result<Vec<RunHistoryEntry>, DomainError>;
}

#[async_trait::async_trait]
impl WorkflowServiceTrait for WorkflowService {
    async fn get(&self, id: &str) -> Result<Option<Workflow>, DomainError> {
        WorkflowService::get(self, id).await
    }

    async fn list(&self) -> Result<Vec<Workflow>, DomainError> {
        WorkflowService::list(self).await
    }

    async fn create(&self, request: CreateWorkflowRequest) -> Result<Workflow, DomainError> {
        WorkflowService::create(self, request).await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        WorkflowService::ping(self).await
    }
}

#[async_trait::async_trait]
impl RunServiceTrait for RunService {
    async fn trigger(&self, workflow_id: &str) -> Result<Run, DomainError> {
        RunService::trigger(self, workflow_id).await
    }

    async fn get(&self, id: &str) -> Result<Option<Run>, DomainError> {
        RunService::get(self, id).await
    }

    async fn list_recent(&self) -> Result<Vec<RunHistoryEntry>, DomainError> {
        RunService::list_recent(self).await
    }
}

impl AppState {
    pub fn new(
        workflow_service: Arc<dyn WorkflowServiceTrait>,
        run_service: Arc<dyn RunServiceTrait>,
    ) -> Self {
        Self {
            workflow_service,
            run_service,
        }
    }
}
