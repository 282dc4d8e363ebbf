//! Core types and error definitions for the effort estimator.
//!
//! This crate provides the foundational types shared across all estimator
//! crates: the error taxonomy, the historical project records flowing through
//! retrieval, and the chat messages handed to language-model backends.
//!
//! # Main types
//!
//! - [`EstimatorError`]: Unified error enum for all estimator subsystems.
//! - [`EstimatorResult`]: Convenience alias for `Result<T, EstimatorError>`.
//! - [`CandidateRecord`]: A raw nearest-neighbour hit from the vector store.
//! - [`ScoredRecord`]: A candidate carrying its composite relevance score.
//! - [`QueryContext`]: Query text, optional effort hint and result count.
//! - [`Message`]: A single chat message sent to an LLM backend.

/// Error taxonomy.
pub mod error;
/// Chat message types.
pub mod message;
/// Historical project records and query context.
pub mod record;

pub use error::{EstimatorError, EstimatorResult};
pub use message::{Message, Role};
pub use record::{
    CandidateRecord, Metadata, QueryContext, ScoredRecord, DEFAULT_TOP_K, KEY_CONFIDENCE,
    KEY_EFFORT_HOURS, KEY_SCORE,
};
