//! Workflow error types

use thiserror::Error;

use crate::domain::DomainError;

/// Errors that can occur while defining or executing a workflow
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    /// Workflow or step malformed or missing at load time
    #[error("Invalid workflow definition: {0}")]
    Definition(String),

    /// Generation backend call failed
    #[error("{0}")]
    Transport(String),

    /// Generated output did not satisfy the step's completion criterion
    #[error("Criteria '{criterion}' not met. Output: {output_preview}...")]
    CriteriaNotMet {
        criterion: String,
        output_preview: String,
    },

    /// A run store write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid run state transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Number of output characters echoed back in a criteria failure
const OUTPUT_PREVIEW_CHARS: usize = 100;

impl WorkflowError {
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn criteria_not_met(criterion: impl Into<String>, output: &str) -> Self {
        Self::CriteriaNotMet {
            criterion: criterion.into(),
            output_preview: output.chars().take(OUTPUT_PREVIEW_CHARS).collect(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<WorkflowError> for DomainError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Definition(message) | WorkflowError::Validation(message) => {
                DomainError::validation(message)
            }
            WorkflowError::Transport(message) => DomainError::provider("generation", message),
            WorkflowError::Persistence(message) => DomainError::storage(message),
            other @ WorkflowError::InvalidTransition { .. } => {
                DomainError::conflict(other.to_string())
            }
            other @ WorkflowError::CriteriaNotMet { .. } => {
                DomainError::internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkflowError::definition("workflow has no steps");
        assert_eq!(
            err.to_string(),
            "Invalid workflow definition: workflow has no steps"
        );

        let err = WorkflowError::transport("HTTP 503: upstream unavailable");
        assert_eq!(err.to_string(), "HTTP 503: upstream unavailable");

        let err = WorkflowError::invalid_transition("completed", "running");
        assert_eq!(
            err.to_string(),
            "Invalid run state transition from 'completed' to 'running'"
        );
    }

    #[test]
    fn test_criteria_not_met_truncates_output() {
        let output = "x".repeat(250);
        let err = WorkflowError::criteria_not_met("contains", &output);

        match &err {
            WorkflowError::CriteriaNotMet { output_preview, .. } => {
                assert_eq!(output_preview.chars().count(), 100);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("Criteria 'contains' not met. Output: xxx"));
    }

    #[test]
    fn test_domain_error_conversion() {
        let domain: DomainError = WorkflowError::persistence("timeout").into();
        assert!(matches!(domain, DomainError::Storage { .. }));

        let domain: DomainError = WorkflowError::definition("bad").into();
        assert!(matches!(domain, DomainError::Validation { .. }));
    }
}
