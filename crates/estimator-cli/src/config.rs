use estimator_agent::ModelConfig;
use estimator_retrieval::{ChromaConfig, NomicConfig, RetrievalConfig};
use serde::Deserialize;
use std::path::Path;

/// Everything the binary needs, read from `estimator.toml` and the environment.
#[derive(Debug, Default, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub embedding: NomicConfig,
    #[serde(default)]
    pub store: ChromaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl EstimatorConfig {
    /// Load the config file, falling back to defaults when it does not exist,
    /// then apply environment overrides.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if tokio::fs::try_exists(path).await? {
            let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                anyhow::anyhow!("Failed to read config file '{}': {e}", path.display())
            })?;
            Self::parse(&raw)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Environment values win over the file. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENROUTER_API_KEY") {
            self.model.api_key = key;
        }
        if let Some(url) = get("OPENROUTER_BASE_URL") {
            self.model.api_base_url = Some(url);
        }
        if let Some(model) = get("MODEL_NAME") {
            self.model.model_id = model;
        }
        if let Some(token) = get("NOMIC_API_TOKEN") {
            self.embedding.api_key = token;
        }
        if let Some(collection) = get("COLLECTION_NAME") {
            self.store.collection = collection;
        }
        if let Some(url) = get("CHROMA_URL") {
            self.store.url = url;
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT '{port}': {e}"))?;
        }
        Ok(())
    }
}
