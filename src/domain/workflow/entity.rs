//! Workflow domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::criterion::CompletionCriterion;
use super::error::WorkflowError;
use crate::domain::storage::{StorageEntity, StorageKey};

/// Placeholder replaced by the previous step's output
pub const CONTEXT_PLACEHOLDER: &str = "{{context}}";

/// Retry budget applied when a step does not specify one
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Validated workflow identifier (UUID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkflowId(String);

impl WorkflowId {
    /// Create a new validated workflow ID
    pub fn new(id: impl Into<String>) -> Result<Self, WorkflowError> {
        let id = id.into();
        Uuid::parse_str(&id)
            .map_err(|_| WorkflowError::validation(format!("Invalid workflow ID '{}'", id)))?;
        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkflowId {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkflowId> for String {
    fn from(id: WorkflowId) -> Self {
        id.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for WorkflowId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Generation models a step may be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "kimi-k2p5")]
    KimiK2p5,
    #[serde(rename = "kimi-k2-instruct-0905")]
    KimiK2Instruct0905,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KimiK2p5 => "kimi-k2p5",
            Self::KimiK2Instruct0905 => "kimi-k2-instruct-0905",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kimi-k2p5" => Ok(Self::KimiK2p5),
            "kimi-k2-instruct-0905" => Ok(Self::KimiK2Instruct0905),
            other => Err(WorkflowError::validation(format!(
                "Unsupported model '{}'",
                other
            ))),
        }
    }
}

fn default_retry_limit() -> u32 {
    DEFAULT_RETRY_LIMIT
}

/// One prompt/model/criterion unit of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub prompt_template: String,
    pub model: ModelType,
    #[serde(rename = "completion_criteria")]
    pub completion_criterion: CompletionCriterion,
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
}

impl WorkflowStep {
    pub fn new(
        prompt_template: impl Into<String>,
        model: ModelType,
        completion_criterion: CompletionCriterion,
    ) -> Self {
        Self {
            prompt_template: prompt_template.into(),
            model,
            completion_criterion,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Substitute every context placeholder with `context`
    pub fn render_prompt(&self, context: &str) -> String {
        self.prompt_template.replace(CONTEXT_PLACEHOLDER, context)
    }

    pub fn validate(&self, index: usize) -> Result<(), WorkflowError> {
        if self.prompt_template.trim().is_empty() {
            return Err(WorkflowError::validation(format!(
                "Step {} has an empty prompt template",
                index
            )));
        }
        Ok(())
    }
}

/// Immutable, named, ordered sequence of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    id: WorkflowId,
    name: String,
    created_at: DateTime<Utc>,
    #[serde(rename = "definition")]
    steps: Vec<WorkflowStep>,
}

impl Workflow {
    /// Build a validated workflow with a fresh identifier
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Result<Self, WorkflowError> {
        let workflow = Self {
            id: WorkflowId::generate(),
            name: name.into(),
            created_at: Utc::now(),
            steps,
        };
        workflow.validate()?;
        Ok(workflow)
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::validation("Workflow name cannot be empty"));
        }
        if self.steps.is_empty() {
            return Err(WorkflowError::validation(
                "Workflow must have at least one step",
            ));
        }
        for (index, step) in self.steps.iter().enumerate() {
            step.validate(index)?;
        }
        Ok(())
    }

    pub fn id(&self) -> &WorkflowId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl StorageEntity for Workflow {
    type Key = WorkflowId;

    fn key(&self) -> &Self::Key {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
