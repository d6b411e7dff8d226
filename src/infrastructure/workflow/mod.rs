//! Workflow infrastructure: persistence and the execution engine

mod engine;
mod evaluator;
mod step_executor;
mod storage_repository;

pub use engine::WorkflowEngine;
pub use evaluator::CriterionEvaluator;
pub use step_executor::{BackoffConfig, StepExecutor, STEP_SYSTEM_INSTRUCTION};
pub use storage_repository::StorageWorkflowRepository;
