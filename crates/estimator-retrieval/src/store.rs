use async_trait::async_trait;
use estimator_core::{EstimatorError, EstimatorResult, Metadata};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Raw nearest-neighbour response, as parallel sequences.
///
/// A sequence is `None` when the store omitted it entirely. Index `i` of each
/// sequence describes the same hit; [`crate::build_candidates`] enforces that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub ids: Option<Vec<Option<String>>>,
    pub texts: Option<Vec<Option<String>>>,
    pub metadatas: Option<Vec<Option<Metadata>>>,
    pub distances: Option<Vec<Option<f64>>>,
}

/// Trait for vector storage backends queried during retrieval.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `limit` nearest neighbours of `vector`, closest first.
    ///
    /// Transport and protocol failures are reported as
    /// [`EstimatorError::StoreQuery`].
    async fn query(&self, vector: &[f32], limit: usize) -> EstimatorResult<QueryResponse>;
}

/// A record held by [`InMemoryVectorStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// In-memory vector store using brute-force cosine similarity.
///
/// Reports cosine similarity (higher is closer) in the `distances` slot so the
/// ranking engine can use it directly.
pub struct InMemoryVectorStore {
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn with_records(records: Vec<StoredRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn insert(&self, record: StoredRecord) {
        self.records.write().await.push(record);
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn query(&self, vector: &[f32], limit: usize) -> EstimatorResult<QueryResponse> {
        if vector.is_empty() {
            return Err(EstimatorError::StoreQuery("Empty query embedding".to_string()));
        }

        let records = self.records.read().await;

        let mut hits: Vec<(f32, &StoredRecord)> = records
            .iter()
            .map(|r| (cosine_similarity(vector, &r.embedding), r))
            .collect();
        hits.sort_by(|a, b| b.0.total_cmp(&a.0));
        hits.truncate(limit);

        let mut ids = Vec::with_capacity(hits.len());
        let mut texts = Vec::with_capacity(hits.len());
        let mut metadatas = Vec::with_capacity(hits.len());
        let mut distances = Vec::with_capacity(hits.len());
        for (similarity, record) in hits {
            ids.push(Some(record.id.clone()));
            texts.push(Some(record.text.clone()));
            metadatas.push(Some(record.metadata.clone()));
            distances.push(Some(f64::from(similarity)));
        }

        Ok(QueryResponse {
            ids: Some(ids),
            texts: Some(texts),
            metadatas: Some(metadatas),
            distances: Some(distances),
        })
    }
}

/// Cosine similarity between two vectors; 0 for mismatched or zero vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}
