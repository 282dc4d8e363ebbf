use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use estimator_core::{EstimatorError, EstimatorResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Settings for the Nomic Atlas embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NomicConfig {
    /// Bearer token. Usually injected from `NOMIC_API_TOKEN`.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Nomic task prefix applied server-side; queries use `search_query`.
    #[serde(default = "default_task_type")]
    pub task_type: String,
    /// Requested output size (`dimensionality`); v1.5 accepts 64 to 768.
    /// The retriever rejects vectors of any other length.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "nomic-embed-text-v1.5".to_string()
}

fn default_base_url() -> String {
    "https://api-atlas.nomic.ai".to_string()
}

fn default_task_type() -> String {
    "search_query".to_string()
}

fn default_dimension() -> usize {
    768
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for NomicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            task_type: default_task_type(),
            dimension: default_dimension(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Embedding client for the Nomic Atlas text endpoint.
pub struct NomicEmbedding {
    config: NomicConfig,
    http: reqwest::Client,
}

impl NomicEmbedding {
    pub fn new(config: NomicConfig) -> EstimatorResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(EstimatorError::Config(
                "Nomic API token is not set (NOMIC_API_TOKEN)".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EstimatorError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for NomicEmbedding {
    async fn embed(&self, text: &str) -> EstimatorResult<Vec<f32>> {
        let url = format!(
            "{}/v1/embedding/text",
            self.config.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.config.model,
            "texts": [text],
            "task_type": self.config.task_type,
            "dimensionality": self.config.dimension,
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EstimatorError::Embedding(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EstimatorError::Embedding(format!(
                "Nomic API error {status}: {error_body}"
            )));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| EstimatorError::Embedding(format!("Malformed Nomic response: {e}")))?;

        let vector = parsed
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                EstimatorError::Embedding("Nomic response carried no embedding".to_string())
            })?;

        debug!(dimension = vector.len(), model = %self.config.model, "Embedded query");
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
