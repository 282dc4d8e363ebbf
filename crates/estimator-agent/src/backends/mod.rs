pub mod openai;

use async_trait::async_trait;
use estimator_core::{EstimatorResult, Message};

/// Trait for LLM provider backends.
///
/// Each provider implements this trait to handle API communication. Tests
/// plug in canned implementations through [`crate::LlmClient::from_backend`].
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Non-streaming chat completion returning the assistant's text.
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
    ) -> EstimatorResult<String>;
}
