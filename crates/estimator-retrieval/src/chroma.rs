use crate::store::{QueryResponse, VectorStore};
use async_trait::async_trait;
use estimator_core::{EstimatorError, EstimatorResult, Metadata};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Connection settings for a Chroma server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromaConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Collection name, resolved to an id on first query.
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_collection() -> String {
    "effort_estimation".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            collection: default_collection(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Path prefix of the Chroma REST API this client speaks (0.4/0.5 servers).
const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Vector store backed by a Chroma collection over its `/api/v1` REST API.
/// Chroma 1.x moved to tenant/database scoped `/api/v2` routes, which this
/// client does not call.
pub struct ChromaVectorStore {
    config: ChromaConfig,
    base: reqwest::Url,
    http: reqwest::Client,
    collection_id: OnceCell<String>,
}

#[derive(Deserialize)]
struct CollectionBody {
    id: String,
}

/// Chroma nests every field one level deeper, one entry per query embedding.
#[derive(Deserialize)]
struct QueryBody {
    ids: Option<Vec<Vec<Option<String>>>>,
    documents: Option<Vec<Vec<Option<String>>>>,
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

impl ChromaVectorStore {
    pub fn new(config: ChromaConfig) -> EstimatorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EstimatorError::Config(format!("Failed to build HTTP client: {e}")))?;
        let base = reqwest::Url::parse(&config.url)
            .map_err(|e| EstimatorError::Config(format!("Invalid Chroma URL '{}': {e}", config.url)))?;
        if base.cannot_be_a_base() {
            return Err(EstimatorError::Config(format!(
                "Invalid Chroma URL '{}': not an http(s) base",
                config.url
            )));
        }
        Ok(Self {
            config,
            base,
            http,
            collection_id: OnceCell::new(),
        })
    }

    /// Each segment is percent-encoded, so collection names with spaces or
    /// slashes stay one path segment.
    fn endpoint(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        url
    }

    async fn collection_id(&self) -> EstimatorResult<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let url = self.endpoint(&["collections", self.config.collection.as_str()]);
                let resp = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| EstimatorError::StoreQuery(e.to_string()))?;

                let status = resp.status();
                if !status.is_success() {
                    let error_body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "unknown error".to_string());
                    return Err(EstimatorError::StoreQuery(format!(
                        "Chroma collection '{}' lookup failed {status}: {error_body}",
                        self.config.collection
                    )));
                }

                let body: CollectionBody = resp.json().await.map_err(|e| {
                    EstimatorError::StoreQuery(format!("Malformed collection response: {e}"))
                })?;
                info!(
                    collection = %self.config.collection,
                    collection_id = %body.id,
                    "Resolved Chroma collection"
                );
                Ok(body.id)
            })
            .await?;
        Ok(id.as_str())
    }
}

#[async_trait]
impl VectorStore for ChromaVectorStore {
    async fn query(&self, vector: &[f32], limit: usize) -> EstimatorResult<QueryResponse> {
        let collection_id = self.collection_id().await?;
        let url = self.endpoint(&["collections", collection_id, "query"]);

        let body = serde_json::json!({
            "query_embeddings": [vector],
            "n_results": limit,
            "include": ["documents", "metadatas", "distances"],
        });

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EstimatorError::StoreQuery(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EstimatorError::StoreQuery(format!(
                "Chroma query error {status}: {error_body}"
            )));
        }

        let parsed: QueryBody = resp
            .json()
            .await
            .map_err(|e| EstimatorError::StoreQuery(format!("Malformed query response: {e}")))?;

        let response = QueryResponse {
            ids: first_query(parsed.ids),
            texts: first_query(parsed.documents),
            metadatas: first_query(parsed.metadatas),
            distances: first_query(parsed.distances),
        };
        debug!(
            limit,
            returned = response.ids.as_ref().map_or(0, Vec::len),
            "Chroma query complete"
        );
        Ok(response)
    }
}

fn first_query<T>(nested: Option<Vec<Vec<T>>>) -> Option<Vec<T>> {
    nested.and_then(|outer| outer.into_iter().next())
}
