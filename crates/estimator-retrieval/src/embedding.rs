use async_trait::async_trait;
use estimator_core::{EstimatorError, EstimatorResult};

/// Turns query text into the vector space of the project store.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Any failure is reported as [`EstimatorError::Embedding`].
    async fn embed(&self, text: &str) -> EstimatorResult<Vec<f32>>;

    fn dimension(&self) -> usize;
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "for", "in", "of", "on", "the", "to", "with",
];

/// Weight of an adjacent word pair relative to a single word.
const PAIR_WEIGHT: f32 = 0.5;

/// In-process embedding: words and adjacent word pairs hashed into buckets.
/// The binary always uses Nomic; this one serves tests and library users
/// that build their own store.
///
/// Vectors are L2-normalized and non-negative, so cosine similarity between
/// two of them falls in `[0, 1]`. Only comparable with a store that was
/// populated by the same embedding and dimension.
#[derive(Debug, Clone)]
pub struct LocalEmbedding {
    dimension: usize,
}

impl LocalEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        (fnv1a(feature.as_bytes()) as usize) % self.dimension
    }
}

impl Default for LocalEmbedding {
    fn default() -> Self {
        Self::new(256)
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed(&self, text: &str) -> EstimatorResult<Vec<f32>> {
        let terms = terms(text);
        if terms.is_empty() {
            return Err(EstimatorError::Embedding(format!(
                "no embeddable terms in {text:?}"
            )));
        }

        let mut vector = vec![0.0f32; self.dimension];
        for term in &terms {
            vector[self.bucket(term)] += 1.0;
        }
        for pair in terms.windows(2) {
            vector[self.bucket(&format!("{} {}", pair[0], pair[1]))] += PAIR_WEIGHT;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        vector.iter_mut().for_each(|x| *x /= norm);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn fnv1a(data: &[u8]) -> u32 {
    data.iter().fold(0x811c_9dc5, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    })
}
