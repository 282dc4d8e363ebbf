use crate::embedding::EmbeddingProvider;
use crate::ranking::rank;
use crate::store::{QueryResponse, VectorStore};
use estimator_core::{
    CandidateRecord, EstimatorError, EstimatorResult, QueryContext, ScoredRecord, DEFAULT_TOP_K,
    KEY_SCORE,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Tuning for a [`Retriever`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates fetched per requested result.
    #[serde(default = "default_over_fetch_factor")]
    pub over_fetch_factor: usize,
    /// Lower bound on the number of candidates fetched.
    #[serde(default = "default_min_fetch")]
    pub min_fetch: usize,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_timeout_secs")]
    pub embed_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_over_fetch_factor() -> usize {
    5
}

fn default_min_fetch() -> usize {
    20
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            over_fetch_factor: default_over_fetch_factor(),
            min_fetch: default_min_fetch(),
            default_top_k: default_top_k(),
            embed_timeout_secs: default_timeout_secs(),
            query_timeout_secs: default_timeout_secs(),
        }
    }
}

/// Single entry point for retrieval: embed the query, over-fetch neighbours,
/// rerank, truncate.
///
/// Holds no mutable state; one instance can serve concurrent requests.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            config: RetrievalConfig::default(),
        }
    }

    /// Replace the tuning. Chainable builder method.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Number of candidates requested from the store for `top_k` results.
    pub fn fetch_limit(&self, top_k: usize) -> usize {
        top_k
            .saturating_mul(self.config.over_fetch_factor)
            .max(self.config.min_fetch)
            .max(top_k)
    }

    /// Retrieve the `top_k` most relevant records for `query_text`.
    ///
    /// # Errors
    ///
    /// - [`EstimatorError::InvalidQuery`] for blank text or `top_k == 0`. A
    ///   zero, negative or non-finite effort hint is ignored.
    /// - [`EstimatorError::Embedding`] when no query vector is obtained or its
    ///   length differs from the embedder's declared dimension.
    /// - [`EstimatorError::StoreQuery`] when the store fails or answers with
    ///   an inconsistent shape.
    pub async fn retrieve(
        &self,
        query_text: &str,
        user_effort_hours: Option<f64>,
        top_k: usize,
    ) -> EstimatorResult<Vec<ScoredRecord>> {
        let context = QueryContext::new(query_text)
            .with_effort_hours(user_effort_hours)
            .with_top_k(top_k);
        self.retrieve_with(&context).await
    }

    /// Same as [`Retriever::retrieve`] for a prepared [`QueryContext`].
    pub async fn retrieve_with(&self, context: &QueryContext) -> EstimatorResult<Vec<ScoredRecord>> {
        context.validate()?;

        let embed_timeout = Duration::from_secs(self.config.embed_timeout_secs);
        let vector = with_timeout(embed_timeout, self.embedder.embed(&context.query_text))
            .await
            .map_err(|e| as_embedding_error(e, embed_timeout))?;
        if vector.is_empty() {
            return Err(EstimatorError::Embedding(
                "embedding service returned an empty vector".to_string(),
            ));
        }
        if vector.len() != self.embedder.dimension() {
            return Err(EstimatorError::Embedding(format!(
                "expected a {}-dimensional vector, got {}",
                self.embedder.dimension(),
                vector.len()
            )));
        }

        let limit = self.fetch_limit(context.top_k);
        let query_timeout = Duration::from_secs(self.config.query_timeout_secs);
        let response = with_timeout(query_timeout, self.store.query(&vector, limit))
            .await
            .map_err(|e| as_store_error(e, query_timeout))?;

        let candidates = build_candidates(response, limit)?;
        let fetched = candidates.len();
        let ranked = rank(candidates, context);

        info!(
            top_k = context.top_k,
            limit,
            fetched,
            returned = ranked.len(),
            effort_hint = ?context.user_effort_hours,
            "Retrieved and reranked records"
        );
        for (idx, record) in ranked.iter().enumerate() {
            debug!(
                rank = idx + 1,
                id = record.id().unwrap_or("-"),
                final_score = record.final_score,
                "Ranked record"
            );
        }

        Ok(ranked)
    }
}

/// Zip the store's parallel sequences into candidates, attaching each raw
/// distance as `metadata.score`.
///
/// Fails with [`EstimatorError::StoreQuery`] when a sequence is missing, the
/// lengths disagree, or more rows came back than `limit`.
pub fn build_candidates(
    response: QueryResponse,
    limit: usize,
) -> EstimatorResult<Vec<CandidateRecord>> {
    let QueryResponse {
        ids,
        texts,
        metadatas,
        distances,
    } = response;

    let ids = ids.ok_or_else(|| missing("ids"))?;
    let texts = texts.ok_or_else(|| missing("texts"))?;
    let metadatas = metadatas.ok_or_else(|| missing("metadatas"))?;
    let distances = distances.ok_or_else(|| missing("distances"))?;

    let len = ids.len();
    if texts.len() != len || metadatas.len() != len || distances.len() != len {
        return Err(EstimatorError::StoreQuery(format!(
            "mismatched result lengths: ids={}, texts={}, metadatas={}, distances={}",
            len,
            texts.len(),
            metadatas.len(),
            distances.len()
        )));
    }
    if len > limit {
        return Err(EstimatorError::StoreQuery(format!(
            "store returned {len} rows for a limit of {limit}"
        )));
    }

    let candidates = ids
        .into_iter()
        .zip(texts)
        .zip(metadatas)
        .zip(distances)
        .map(|(((id, text), metadata), distance)| {
            let mut metadata = metadata.unwrap_or_default();
            match distance.and_then(serde_json::Number::from_f64) {
                Some(score) => {
                    metadata.insert(KEY_SCORE.to_string(), serde_json::Value::Number(score));
                }
                None => {
                    metadata.remove(KEY_SCORE);
                }
            }
            CandidateRecord::new(id, text.unwrap_or_default(), metadata)
        })
        .collect();

    Ok(candidates)
}

fn missing(field: &str) -> EstimatorError {
    EstimatorError::StoreQuery(format!("store response is missing '{field}'"))
}

/// `None` marks an elapsed deadline.
async fn with_timeout<T>(
    duration: Duration,
    call: impl Future<Output = EstimatorResult<T>>,
) -> Result<T, Option<EstimatorError>> {
    match tokio::time::timeout(duration, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Some(e)),
        Err(_) => Err(None),
    }
}

fn as_embedding_error(err: Option<EstimatorError>, waited: Duration) -> EstimatorError {
    match err {
        Some(e @ EstimatorError::Embedding(_)) => e,
        Some(other) => EstimatorError::Embedding(other.to_string()),
        None => EstimatorError::Embedding(format!("embedding call timed out after {waited:?}")),
    }
}

fn as_store_error(err: Option<EstimatorError>, waited: Duration) -> EstimatorError {
    match err {
        Some(e @ EstimatorError::StoreQuery(_)) => e,
        Some(other) => EstimatorError::StoreQuery(other.to_string()),
        None => EstimatorError::StoreQuery(format!("store query timed out after {waited:?}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use estimator_core::Metadata;
    use serde_json::json;

    fn response(n: usize) -> QueryResponse {
        QueryResponse {
            ids: Some((0..n).map(|i| Some(format!("p{i}"))).collect()),
            texts: Some((0..n).map(|i| Some(format!("text {i}"))).collect()),
            metadatas: Some((0..n).map(|_| Some(Metadata::new())).collect()),
            distances: Some((0..n).map(|i| Some(i as f64 / 10.0)).collect()),
        }
    }

    #[test]
    fn test_build_candidates_attaches_distance_as_score() {
        let candidates = build_candidates(response(3), 10).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[2].id.as_deref(), Some("p2"));
        assert_eq!(candidates[2].text, "text 2");
        assert_eq!(candidates[2].metadata["score"], json!(0.2));
    }

    #[test]
    fn test_build_candidates_distance_overrides_stored_score() {
        let mut resp = response(1);
        let mut metadata = Metadata::new();
        metadata.insert("score".to_string(), json!(99));
        metadata.insert("confidence".to_string(), json!(0.7));
        resp.metadatas = Some(vec![Some(metadata)]);

        let candidates = build_candidates(resp, 5).unwrap();
        assert_eq!(candidates[0].metadata["score"], json!(0.0));
        assert_eq!(candidates[0].metadata["confidence"], json!(0.7));
    }

    #[test]
    fn test_build_candidates_null_entries_fall_back() {
        let resp = QueryResponse {
            ids: Some(vec![None]),
            texts: Some(vec![None]),
            metadatas: Some(vec![None]),
            distances: Some(vec![None]),
        };
        let candidates = build_candidates(resp, 5).unwrap();
        assert!(candidates[0].id.is_none());
        assert!(candidates[0].text.is_empty());
        assert!(candidates[0].metadata.is_empty());
    }

    #[test]
    fn test_build_candidates_missing_array() {
        for field in ["ids", "texts", "metadatas", "distances"] {
            let mut resp = response(2);
            match field {
                "ids" => resp.ids = None,
                "texts" => resp.texts = None,
                "metadatas" => resp.metadatas = None,
                _ => resp.distances = None,
            }
            let err = build_candidates(resp, 10).unwrap_err();
            assert!(matches!(err, EstimatorError::StoreQuery(_)), "{field}");
            assert!(err.to_string().contains(field));
        }
    }

    #[test]
    fn test_build_candidates_mismatched_lengths() {
        let mut resp = response(3);
        resp.distances = Some(vec![Some(0.1), Some(0.2)]);
        let err = build_candidates(resp, 10).unwrap_err();
        assert!(matches!(err, EstimatorError::StoreQuery(_)));
    }

    #[test]
    fn test_build_candidates_over_limit() {
        let err = build_candidates(response(4), 3).unwrap_err();
        assert!(matches!(err, EstimatorError::StoreQuery(_)));
    }

    #[test]
    fn test_error_mapping_keeps_matching_variant() {
        let e = as_embedding_error(
            Some(EstimatorError::Embedding("401".to_string())),
            Duration::from_secs(1),
        );
        assert_eq!(e.to_string(), "Embedding error: 401");

        let e = as_store_error(
            Some(EstimatorError::Http("reset".to_string())),
            Duration::from_secs(1),
        );
        assert!(matches!(e, EstimatorError::StoreQuery(_)));

        let e = as_store_error(None, Duration::from_secs(2));
        assert!(e.to_string().contains("timed out"));
    }
}
