//! Drives a single workflow step through generate/validate attempts

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::evaluator::CriterionEvaluator;
use crate::config::BackoffSettings;
use crate::domain::run::StepResult;
use crate::domain::workflow::{WorkflowError, WorkflowStep};
use crate::domain::LlmProvider;

/// System instruction sent with every step generation
pub const STEP_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant.";

/// Delay schedule applied after transport failures
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::from(&BackoffSettings::default())
    }
}

impl From<&BackoffSettings> for BackoffConfig {
    fn from(settings: &BackoffSettings) -> Self {
        Self {
            initial_delay_ms: settings.initial_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            multiplier: settings.multiplier,
        }
    }
}

impl BackoffConfig {
    /// Retry immediately
    pub fn none() -> Self {
        Self {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1.0,
        }
    }

    /// Delay after the `failures`-th transport failure (1-indexed)
    pub fn delay_for_failure(&self, failures: u32) -> Duration {
        if failures <= 1 {
            return Duration::from_millis(self.initial_delay_ms.min(self.max_delay_ms));
        }

        let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX);
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let delay_ms = delay.min(self.max_delay_ms as f64) as u64;

        Duration::from_millis(delay_ms)
    }
}

/// Runs one step: render prompt, then generate and validate within the retry budget
#[derive(Debug, Clone)]
pub struct StepExecutor {
    provider: Arc<dyn LlmProvider>,
    evaluator: CriterionEvaluator,
    backoff: BackoffConfig,
}

impl StepExecutor {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        evaluator: CriterionEvaluator,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            provider,
            evaluator,
            backoff,
        }
    }

    /// Drive `step` to completion or exhaustion. Never fails: the outcome is the StepResult.
    pub async fn run_step(&self, index: usize, step: &WorkflowStep, context: &str) -> StepResult {
        let mut prompt = step.render_prompt(context);
        let criterion = &step.completion_criterion;

        let mut failed_attempts: u32 = 0;
        let mut transport_failures: u32 = 0;
        let mut last_error: Option<WorkflowError> = None;

        while failed_attempts <= step.retry_limit {
            match self
                .provider
                .generate(step.model.as_str(), &prompt, STEP_SYSTEM_INSTRUCTION)
                .await
            {
                Ok(output) => {
                    if self.evaluator.evaluate(&output, criterion).await {
                        debug!(
                            step_index = index,
                            retries = failed_attempts,
                            "Step output accepted"
                        );
                        return StepResult::completed(index, context, output, failed_attempts);
                    }

                    failed_attempts += 1;
                    info!(
                        step_index = index,
                        criterion = %criterion,
                        attempt = failed_attempts,
                        retry_limit = step.retry_limit,
                        "Step output rejected by criterion"
                    );
                    prompt.push_str(&retry_feedback(criterion.type_name()));
                    last_error =
                        Some(WorkflowError::criteria_not_met(criterion.type_name(), &output));
                }
                Err(e) => {
                    failed_attempts += 1;
                    transport_failures += 1;
                    warn!(
                        step_index = index,
                        attempt = failed_attempts,
                        error = %e,
                        "Generation call failed"
                    );
                    last_error = Some(WorkflowError::transport(e.to_string()));

                    if failed_attempts <= step.retry_limit {
                        let delay = self.backoff.delay_for_failure(transport_failures);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Validation criteria not met".to_string());

        StepResult::failed(
            index,
            context,
            format!(
                "Failed after {} attempts. Last error: {}",
                failed_attempts, last_error
            ),
            step.retry_limit,
        )
    }
}

fn retry_feedback(criterion: &str) -> String {
    format!(
        "\n\nSystem: Your previous response did not meet the criteria: {}. Please try again.",
        criterion
    )
}
