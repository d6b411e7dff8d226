//! Run domain entities

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::workflow::{WorkflowError, WorkflowId};

/// Validated run identifier (UUID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Result<Self, WorkflowError> {
        let id = id.into();
        Uuid::parse_str(&id)
            .map_err(|_| WorkflowError::validation(format!("Invalid run ID '{}'", id)))?;
        Ok(Self(id))
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RunId {
    type Error = WorkflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for RunId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Status of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Recorded, waiting for the engine to pick it up
    #[default]
    Pending,

    Running,

    Completed,

    Failed,
}

impl RunStatus {
    /// Check if this status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if this status can transition to another status
    pub fn can_transition_to(&self, target: RunStatus) -> bool {
        match (self, target) {
            (Self::Pending, Self::Running) => true,
            // Workflow could not be loaded
            (Self::Pending, Self::Failed) => true,

            (Self::Running, Self::Completed) => true,
            (Self::Running, Self::Failed) => true,

            _ => false,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Status of a single step within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Step id used for the diagnostic result of a run whose workflow never loaded
pub const WORKFLOW_STEP_ID: &str = "workflow";

/// Outcome (or in-flight state) of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(default)]
    pub input_context: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub retries_used: u32,
}

impl StepResult {
    /// Optimistic marker published before a step starts
    pub fn running(index: usize, input_context: impl Into<String>) -> Self {
        Self {
            step_id: index.to_string(),
            status: StepStatus::Running,
            input_context: input_context.into(),
            output: None,
            error: None,
            retries_used: 0,
        }
    }

    pub fn completed(
        index: usize,
        input_context: impl Into<String>,
        output: impl Into<String>,
        retries_used: u32,
    ) -> Self {
        Self {
            step_id: index.to_string(),
            status: StepStatus::Completed,
            input_context: input_context.into(),
            output: Some(output.into()),
            error: None,
            retries_used,
        }
    }

    pub fn failed(
        index: usize,
        input_context: impl Into<String>,
        error: impl Into<String>,
        retries_used: u32,
    ) -> Self {
        Self {
            step_id: index.to_string(),
            status: StepStatus::Failed,
            input_context: input_context.into(),
            output: None,
            error: Some(error.into()),
            retries_used,
        }
    }

    /// Diagnostic result for a run that failed before any step ran
    pub fn load_failure(error: impl fmt::Display) -> Self {
        Self {
            step_id: WORKFLOW_STEP_ID.to_string(),
            status: StepStatus::Failed,
            input_context: String::new(),
            output: None,
            error: Some(format!("Failed to initiate workflow: {}", error)),
            retries_used: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

/// Mutable execution record of one workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    id: RunId,
    workflow_id: WorkflowId,
    status: RunStatus,
    current_step_index: usize,
    #[serde(default)]
    steps_results: Vec<StepResult>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Run {
    /// New pending run for a workflow
    pub fn pending(workflow_id: WorkflowId) -> Self {
        let now = Utc::now();
        Self {
            id: RunId::generate(),
            workflow_id,
            status: RunStatus::Pending,
            current_step_index: 0,
            steps_results: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn steps_results(&self) -> &[StepResult] {
        &self.steps_results
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Check that applying `update` keeps the run's invariants:
    /// terminal runs are frozen, the step index never moves backwards,
    /// status changes follow the state machine and earlier results are never rewritten.
    pub fn check_update(&self, update: &RunUpdate) -> Result<(), WorkflowError> {
        if self.status.is_terminal() && !update.is_empty() {
            return Err(WorkflowError::validation(format!(
                "Run '{}' is {} and can no longer change",
                self.id, self.status
            )));
        }

        if let Some(status) = update.status {
            if status != self.status && !self.status.can_transition_to(status) {
                return Err(WorkflowError::invalid_transition(
                    self.status.to_string(),
                    status.to_string(),
                ));
            }
        }

        if let Some(index) = update.current_step_index {
            if index < self.current_step_index {
                return Err(WorkflowError::validation(format!(
                    "Step index cannot move from {} back to {}",
                    self.current_step_index, index
                )));
            }
        }

        if let Some(results) = &update.steps_results {
            if !extends_results(&self.steps_results, results) {
                return Err(WorkflowError::validation(
                    "Step results may only be appended or have a running last entry finalized",
                ));
            }
        }

        Ok(())
    }

    /// Apply a partial update in place, stamping `updated_at`
    pub fn apply(&mut self, update: RunUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(index) = update.current_step_index {
            self.current_step_index = index;
        }
        if let Some(results) = update.steps_results {
            self.steps_results = results;
        }
        self.updated_at = Utc::now();
    }
}

/// Everything in `current` survives into `next` except a trailing running entry
fn extends_results(current: &[StepResult], next: &[StepResult]) -> bool {
    let frozen = match current.last() {
        Some(last) if last.status == StepStatus::Running => current.len() - 1,
        _ => current.len(),
    };
    next.len() >= frozen && next[..frozen] == current[..frozen]
}

impl StorageEntity for Run {
    type Key = RunId;

    fn key(&self) -> &Self::Key {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Partial run record; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_results: Option<Vec<StepResult>>,
}

impl RunUpdate {
    pub fn status(status: RunStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn step_index(index: usize) -> Self {
        Self {
            current_step_index: Some(index),
            ..Self::default()
        }
    }

    pub fn results(results: Vec<StepResult>) -> Self {
        Self {
            steps_results: Some(results),
            ..Self::default()
        }
    }

    pub fn with_results(mut self, results: Vec<StepResult>) -> Self {
        self.steps_results = Some(results);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.current_step_index.is_none() && self.steps_results.is_none()
    }

    /// JSON merge patch for the store, always carrying a fresh `updated_at`
    pub fn to_patch(&self) -> Value {
        let mut patch =
            serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()));
        if let Some(fields) = patch.as_object_mut() {
            fields.insert("updated_at".to_string(), serde_json::json!(Utc::now()));
        }
        patch
    }
}

/// History row: the run plus the name of its workflow, when it could be resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunHistoryEntry {
    #[serde(flatten)]
    pub run: Run,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
}

impl From<Run> for RunHistoryEntry {
    fn from(run: Run) -> Self {
        Self {
            run,
            workflow_name: None,
        }
    }
}
