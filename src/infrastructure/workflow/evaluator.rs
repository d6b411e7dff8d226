//! Completion criterion evaluation

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::workflow::{
    judge_prompt, judge_verdict, output_contains, output_is_json, CompletionCriterion,
    JUDGE_SYSTEM_INSTRUCTION,
};
use crate::domain::LlmProvider;

/// Decides whether generated text satisfies a step's criterion
///
/// Evaluation never errors: a judge call that fails counts as a rejection.
#[derive(Debug, Clone)]
pub struct CriterionEvaluator {
    provider: Arc<dyn LlmProvider>,
    judge_model: String,
}

impl CriterionEvaluator {
    pub fn new(provider: Arc<dyn LlmProvider>, judge_model: impl Into<String>) -> Self {
        Self {
            provider,
            judge_model: judge_model.into(),
        }
    }

    pub fn judge_model(&self) -> &str {
        &self.judge_model
    }

    pub async fn evaluate(&self, output: &str, criterion: &CompletionCriterion) -> bool {
        match criterion {
            CompletionCriterion::Contains { value } => output_contains(output, value.as_deref()),
            CompletionCriterion::JsonValid => output_is_json(output),
            CompletionCriterion::LlmJudge { instruction } => self.judge(instruction, output).await,
            CompletionCriterion::Regex { .. } | CompletionCriterion::Unknown(_) => {
                debug!(criterion = %criterion, "Criterion not enforced, accepting output");
                true
            }
        }
    }

    async fn judge(&self, instruction: &str, output: &str) -> bool {
        let prompt = judge_prompt(instruction, output);

        match self
            .provider
            .generate(&self.judge_model, &prompt, JUDGE_SYSTEM_INSTRUCTION)
            .await
        {
            Ok(reply) => judge_verdict(&reply),
            Err(e) => {
                warn!(
                    error = %e,
                    judge_model = %self.judge_model,
                    "Judge call failed, rejecting output"
                );
                false
            }
        }
    }
}
