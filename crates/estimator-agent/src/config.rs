use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    OpenRouter,
    /// Groq cloud inference (OpenAI-compatible API).
    Groq,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Usually injected from `OPENROUTER_API_KEY`.
    #[serde(default)]
    pub api_key: String,
    /// API root including the version segment, e.g.
    /// `https://openrouter.ai/api/v1`. Usually injected from
    /// `OPENROUTER_BASE_URL`.
    pub api_base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> LlmProvider {
    LlmProvider::OpenRouter
}

fn default_model_id() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_id: default_model_id(),
            api_key: String::new(),
            api_base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ModelConfig {
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url.trim_end_matches('/')
        } else {
            match self.provider {
                LlmProvider::OpenAi => "https://api.openai.com/v1",
                LlmProvider::OpenRouter => "https://openrouter.ai/api/v1",
                LlmProvider::Groq => "https://api.groq.com/openai/v1",
            }
        }
    }
}
