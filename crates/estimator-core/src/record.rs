use crate::error::{EstimatorError, EstimatorResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key holding the similarity value assigned from the store distance.
pub const KEY_SCORE: &str = "score";
/// Metadata key holding the stored confidence judgment.
pub const KEY_CONFIDENCE: &str = "confidence";
/// Metadata key holding the historical effort in hours.
pub const KEY_EFFORT_HOURS: &str = "effort_hours";

/// Number of records returned when the caller does not ask for a count.
pub const DEFAULT_TOP_K: usize = 3;

/// Scalar metadata attached to a historical project record.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A raw nearest-neighbour hit returned by the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Store identifier, if the store reported one.
    pub id: Option<String>,
    /// Document body. Never modified after retrieval.
    pub text: String,
    /// Metadata, including `score` once the orchestrator has attached it.
    #[serde(default)]
    pub metadata: Metadata,
}

impl CandidateRecord {
    pub fn new(id: Option<String>, text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id,
            text: text.into(),
            metadata,
        }
    }

    /// Reads a metadata entry as a finite number.
    ///
    /// Accepts JSON numbers and numeric strings; anything else is `None`.
    pub fn metadata_number(&self, key: &str) -> Option<f64> {
        let value = match self.metadata.get(key)? {
            serde_json::Value::Number(n) => n.as_f64()?,
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Returns the first `max_chars` characters of the text.
    pub fn snippet(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}

/// A candidate together with its composite relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: CandidateRecord,
    #[serde(rename = "finalScore")]
    pub final_score: f64,
}

impl ScoredRecord {
    pub fn id(&self) -> Option<&str> {
        self.record.id.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.record.text
    }

    pub fn metadata(&self) -> &Metadata {
        &self.record.metadata
    }
}

/// Everything the ranking engine needs to know about a request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    pub query_text: String,
    /// Rough effort hint in hours; `None` disables the effort-proximity term.
    /// Zero, negative and non-finite hints are stored as `None`.
    pub user_effort_hours: Option<f64>,
    pub top_k: usize,
}

impl QueryContext {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            user_effort_hours: None,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_effort_hours(mut self, hours: Option<f64>) -> Self {
        self.user_effort_hours = hours.filter(|h| h.is_finite() && *h > 0.0);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Rejects blank query text and a zero result count.
    pub fn validate(&self) -> EstimatorResult<()> {
        if self.query_text.trim().is_empty() {
            return Err(EstimatorError::InvalidQuery(
                "query text must not be blank".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(EstimatorError::InvalidQuery(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
