//! HTTP request and response types

pub mod error;
pub mod json;
pub mod workflow;

pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
pub use workflow::{CreateWorkflowBody, RunTriggeredResponse, StepBody};
