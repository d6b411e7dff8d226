//! Workflow domain module
//!
//! A workflow is an immutable, ordered list of steps. Each step renders its
//! prompt from the previous step's output (`{{context}}`), is bound to one
//! generation model and is accepted only once its completion criterion passes.

mod criterion;
mod entity;
mod error;
pub mod repository;

pub use criterion::{
    judge_prompt, judge_verdict, output_contains, output_is_json, CompletionCriterion,
    JUDGE_SYSTEM_INSTRUCTION,
};
pub use entity::{
    ModelType, Workflow, WorkflowId, WorkflowStep, CONTEXT_PLACEHOLDER, DEFAULT_RETRY_LIMIT,
};
pub use error::WorkflowError;
pub use repository::WorkflowRepository;
