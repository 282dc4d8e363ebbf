//! Retrieval and reranking of historical project records.
//!
//! A query is embedded, the vector store is asked for more neighbours than
//! the caller wants, and the ranking engine blends similarity, stored
//! confidence and effort proximity into one score before truncating.
//!
//! # Main types
//!
//! - [`EmbeddingProvider`]: Trait for turning text into a vector.
//! - [`NomicEmbedding`]: Nomic Atlas embedding client.
//! - [`LocalEmbedding`]: Local hashed bag-of-words embedding.
//! - [`VectorStore`]: Trait for nearest-neighbour queries.
//! - [`ChromaVectorStore`]: Chroma server client.
//! - [`InMemoryVectorStore`]: Brute-force in-process store.
//! - [`Retriever`]: Embed, over-fetch, rank.
//! - [`rank`]: The pure composite-score ranking function.

/// Chroma HTTP vector store client.
pub mod chroma;
/// Embedding provider trait and local implementation.
pub mod embedding;
/// Nomic Atlas embedding client.
pub mod nomic;
/// Composite scoring and ordering of candidates.
pub mod ranking;
/// Retrieval orchestration.
pub mod retriever;
/// Vector store trait and in-memory implementation.
pub mod store;

pub use chroma::{ChromaConfig, ChromaVectorStore};
pub use embedding::{EmbeddingProvider, LocalEmbedding};
pub use nomic::{NomicConfig, NomicEmbedding};
pub use ranking::{rank, SubScores};
pub use retriever::{build_candidates, RetrievalConfig, Retriever};
pub use store::{InMemoryVectorStore, QueryResponse, StoredRecord, VectorStore};
