use async_trait::async_trait;
use std::fmt::Debug;
use tracing::debug;

use super::{LlmRequest, LlmResponse};
use crate::domain::DomainError;

/// Trait for text-generation backends
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send a chat completion request
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Generate text for a single prompt under a system instruction
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<String, DomainError> {
        let response = self
            .chat(model, LlmRequest::instructed(system_instruction, prompt))
            .await?;

        if let Some(usage) = response.usage {
            debug!(
                provider = self.provider_name(),
                model,
                finish_reason = ?response.finish_reason,
                total_tokens = usage.total_tokens(),
                "Generation finished"
            );
        }

        Ok(response.content().to_string())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::domain::llm::Message;

    /// A recorded call made against the mock provider
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub model: String,
        pub system: Option<String>,
        pub prompt: String,
    }

    /// LLM provider that replays a scripted sequence of outcomes
    ///
    /// Once the script is exhausted every call returns the fallback response.
    #[derive(Debug)]
    pub struct MockLlmProvider {
        script: Mutex<VecDeque<Result<String, String>>>,
        fallback: Mutex<Result<String, String>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockLlmProvider {
        pub fn new() -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(Err("No mock response configured".to_string())),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Always answer with the given text
        pub fn always(text: impl Into<String>) -> Self {
            Self::new().with_fallback(text)
        }

        pub fn with_fallback(self, text: impl Into<String>) -> Self {
            *self.fallback.lock().unwrap() = Ok(text.into());
            self
        }

        pub fn with_fallback_error(self, error: impl Into<String>) -> Self {
            *self.fallback.lock().unwrap() = Err(error.into());
            self
        }

        pub fn then_respond(self, text: impl Into<String>) -> Self {
            self.script.lock().unwrap().push_back(Ok(text.into()));
            self
        }

        pub fn then_fail(self, error: impl Into<String>) -> Self {
            self.script.lock().unwrap().push_back(Err(error.into()));
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Default for MockLlmProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn chat(
            &self,
            model: &str,
            request: LlmRequest,
        ) -> Result<LlmResponse, DomainError> {
            let system = request.system_text().map(str::to_string);

            self.calls.lock().unwrap().push(RecordedCall {
                model: model.to_string(),
                system,
                prompt: request.last_user_text().unwrap_or_default().to_string(),
            });

            let outcome = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.lock().unwrap().clone());

            match outcome {
                Ok(text) => Ok(LlmResponse::new(model, Message::assistant(text))),
                Err(error) => Err(DomainError::provider("mock", error)),
            }
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}
