//! Run repository trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{Run, RunId, RunUpdate};
use crate::domain::DomainError;

/// Repository for run persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Get a run by ID
    async fn get(&self, id: &RunId) -> Result<Option<Run>, DomainError>;

    /// Insert a new run record
    async fn create(&self, run: Run) -> Result<Run, DomainError>;

    /// Apply a partial update and return the stored run
    async fn update(&self, id: &RunId, update: RunUpdate) -> Result<Run, DomainError>;

    /// Most recent runs, newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<Run>, DomainError>;
}
