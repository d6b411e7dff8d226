//! Workflow repository trait

use async_trait::async_trait;

use super::entity::{Workflow, WorkflowId};
use crate::domain::DomainError;

/// Repository trait for workflow persistence
#[async_trait]
pub trait WorkflowRepository: Send + Sync + std::fmt::Debug {
    /// Get a workflow by ID
    async fn get(&self, id: &WorkflowId) -> Result<Option<Workflow>, DomainError>;

    /// Insert a new workflow
    async fn create(&self, workflow: Workflow) -> Result<Workflow, DomainError>;

    /// List workflows, newest first
    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Workflow>, DomainError>;

    /// Reachability check
    async fn ping(&self) -> Result<(), DomainError>;
}
