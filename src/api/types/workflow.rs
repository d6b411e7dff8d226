//! Workflow and run request/response bodies

use serde::{Deserialize, Serialize};

use crate::domain::{RunStatus, WorkflowStep};
use crate::infrastructure::services::CreateWorkflowRequest;

/// Request body for `POST /workflows`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowBody {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<StepBody>,
}

/// One step as submitted; `order` only affects placement
#[derive(Debug, Clone, Deserialize)]
pub struct StepBody {
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(flatten)]
    pub step: WorkflowStep,
}

impl CreateWorkflowBody {
    /// Steps with an explicit `order` are placed by it; ties and unordered
    /// steps keep their submitted position.
    pub fn into_request(self) -> CreateWorkflowRequest {
        let mut steps: Vec<(usize, StepBody)> = self.steps.into_iter().enumerate().collect();
        steps.sort_by_key(|(position, body)| (body.order.unwrap_or(*position as i64), *position));

        CreateWorkflowRequest::new(self.name)
            .with_steps(steps.into_iter().map(|(_, body)| body.step).collect())
    }
}

/// Response body for `POST /run/{workflow_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTriggeredResponse {
    pub run_id: String,
    pub status: RunStatus,
}
