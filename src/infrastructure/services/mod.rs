//! Application services

mod run_service;
mod workflow_service;

pub use run_service::{RunDispatcher, RunService, HISTORY_LIMIT};
pub use workflow_service::{CreateWorkflowRequest, WorkflowService};
