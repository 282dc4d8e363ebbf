use crate::backends::openai::OpenAiBackend;
use crate::backends::LlmBackend;
use crate::config::{LlmProvider, ModelConfig};
use estimator_core::{EstimatorError, EstimatorResult, Message};

/// Completion client used by the estimation chain. Every supported provider
/// speaks the OpenAI chat API, so one backend serves them all.
pub struct LlmClient {
    backend: Box<dyn LlmBackend>,
}

impl LlmClient {
    pub fn new(config: ModelConfig) -> EstimatorResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(EstimatorError::Config(
                "LLM API key is not set (OPENROUTER_API_KEY)".to_string(),
            ));
        }
        let backend: Box<dyn LlmBackend> = match config.provider {
            LlmProvider::OpenAi | LlmProvider::OpenRouter | LlmProvider::Groq => {
                Box::new(OpenAiBackend::new(config)?)
            }
        };
        Ok(Self { backend })
    }

    /// Wrap an existing backend, e.g. a canned one in tests.
    pub fn from_backend(backend: Box<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
    ) -> EstimatorResult<String> {
        self.backend.chat(system_prompt, messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_config_error() {
        let result = LlmClient::new(ModelConfig::default());
        assert!(matches!(result, Err(EstimatorError::Config(_))));
    }

    #[test]
    fn test_new_with_key_builds_openai_backend() {
        let config = ModelConfig {
            api_key: "sk-test".to_string(),
            ..ModelConfig::default()
        };
        assert!(LlmClient::new(config).is_ok());
    }
}
