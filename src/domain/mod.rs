//! Domain layer - Core business logic and entities

pub mod error;
pub mod llm;
pub mod run;
pub mod storage;
pub mod workflow;

pub use error::DomainError;
pub use llm::{FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole, Usage};
pub use run::{
    Run, RunHistoryEntry, RunId, RunRepository, RunStatus, RunUpdate, StepResult, StepStatus,
};
pub use storage::{ListOptions, Storage, StorageEntity, StorageKey};
pub use workflow::{
    CompletionCriterion, ModelType, Workflow, WorkflowError, WorkflowId, WorkflowRepository,
    WorkflowStep,
};
