use thiserror::Error;

/// A convenience `Result` alias using [`EstimatorError`].
pub type EstimatorResult<T> = Result<T, EstimatorError>;

/// Top-level error type for the estimator.
///
/// Retrieval failures are surfaced unmodified; the invoking layer decides how
/// to present them.
#[derive(Error, Debug)]
pub enum EstimatorError {
    /// The embedding call failed or returned no vector.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The vector store call failed or returned an inconsistent shape.
    #[error("Store query error: {0}")]
    StoreQuery(String),

    /// Blank query text or zero `top_k`.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The language model returned a response that could not be used.
    #[error("Completion error: {0}")]
    Completion(String),

    /// An outbound HTTP request failed (e.g. LLM API call).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration parsing or validation failed.
    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EstimatorError {
    /// Returns true when the failure originated in an external service
    /// (embedding, vector store, or LLM transport).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            EstimatorError::Embedding(_) | EstimatorError::StoreQuery(_) | EstimatorError::Http(_)
        )
    }
}
