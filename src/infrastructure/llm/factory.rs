use std::sync::Arc;
use std::time::Duration;

use super::http_client::HttpClient;
use super::OpenAiProvider;
use crate::config::LlmConfig;
use crate::domain::{DomainError, LlmProvider};

/// Factory for creating LLM providers
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Build the generation client described by `config`
    pub fn create(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, DomainError> {
        if config.api_key.trim().is_empty() {
            return Err(DomainError::configuration(
                "LLM API key is not set (llm.api_key or UNBOUND_API_KEY)",
            ));
        }

        if config.timeout_secs == 0 {
            return Err(DomainError::configuration(
                "llm.timeout_secs must be greater than zero",
            ));
        }

        let http_client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        let provider = OpenAiProvider::with_base_url(http_client, &config.api_key, &config.base_url)
            .with_default_temperature(config.temperature);

        Ok(Arc::new(provider))
    }
}
