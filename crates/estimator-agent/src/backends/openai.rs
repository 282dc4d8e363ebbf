use super::LlmBackend;
use crate::config::{LlmProvider, ModelConfig};
use async_trait::async_trait;
use estimator_core::{EstimatorError, EstimatorResult, Message, Role};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Chat-completions client for OpenAI, OpenRouter, Groq and any other
/// provider speaking the same API.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: ModelConfig) -> EstimatorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EstimatorError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    fn request_body(&self, system_prompt: Option<&str>, messages: &[Message]) -> Value {
        let messages: Vec<Value> = system_prompt
            .map(|sys| json!({"role": Role::System.as_str(), "content": sys}))
            .into_iter()
            .chain(
                messages
                    .iter()
                    .map(|m| json!({"role": m.role.as_str(), "content": m.content})),
            )
            .collect();

        json!({
            "model": self.config.model_id,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": messages,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.bearer_auth(&self.config.api_key);
        match self.config.provider {
            // attribution headers
            LlmProvider::OpenRouter => request
                .header("HTTP-Referer", OPENROUTER_REFERER)
                .header("X-Title", OPENROUTER_TITLE),
            LlmProvider::OpenAi | LlmProvider::Groq => request,
        }
    }
}

const OPENROUTER_REFERER: &str = "https://github.com/effort-estimator/estimator";
const OPENROUTER_TITLE: &str = "Effort Estimator";

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn chat(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
    ) -> EstimatorResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url());
        let resp = self
            .authorize(self.http.post(&url))
            .json(&self.request_body(system_prompt, messages))
            .send()
            .await
            .map_err(|e| EstimatorError::Http(format!("chat request to {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(EstimatorError::Http(format!(
                "{} returned {status}: {detail}",
                self.config.model_id
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| EstimatorError::Completion(format!("unreadable completion body: {e}")))?;

        let text = parse_openai_response(&body)?;
        debug!(model = %self.config.model_id, chars = text.len(), "Completion received");
        Ok(text)
    }
}

/// Extract the assistant text from a chat completions body.
pub fn parse_openai_response(body: &Value) -> EstimatorResult<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| {
            EstimatorError::Completion(format!("response carried no message content: {body}"))
        })
}
