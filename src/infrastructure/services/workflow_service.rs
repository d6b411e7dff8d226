//! Workflow service - create, list and fetch workflow definitions

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::workflow::{Workflow, WorkflowId, WorkflowRepository, WorkflowStep};
use crate::domain::DomainError;

/// Request to create a new workflow
#[derive(Debug, Clone)]
pub struct CreateWorkflowRequest {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

impl CreateWorkflowRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_steps(mut self, steps: Vec<WorkflowStep>) -> Self {
        self.steps = steps;
        self
    }
}

/// Workflow service
#[derive(Debug)]
pub struct WorkflowService {
    repository: Arc<dyn WorkflowRepository>,
}

impl WorkflowService {
    pub fn new(repository: Arc<dyn WorkflowRepository>) -> Self {
        Self { repository }
    }

    /// Get a workflow by ID; malformed IDs are simply not found
    pub async fn get(&self, id: &str) -> Result<Option<Workflow>, DomainError> {
        match WorkflowId::new(id) {
            Ok(id) => self.repository.get(&id).await,
            Err(_) => Ok(None),
        }
    }

    /// List workflows, newest first
    pub async fn list(&self) -> Result<Vec<Workflow>, DomainError> {
        self.repository.list_recent(None).await
    }

    /// Validate and save a new workflow
    #[instrument(skip(self, request), fields(name = %request.name, steps = request.steps.len()))]
    pub async fn create(&self, request: CreateWorkflowRequest) -> Result<Workflow, DomainError> {
        let workflow = Workflow::new(request.name, request.steps)?;
        let workflow = self.repository.create(workflow).await?;
        info!(workflow_id = %workflow.id(), "Created workflow");
        Ok(workflow)
    }

    /// Store reachability check
    pub async fn ping(&self) -> Result<(), DomainError> {
        self.repository.ping().await
    }
}
