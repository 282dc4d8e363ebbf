pub mod backends;
pub mod chain;
pub mod config;
pub mod llm;
pub mod prompt;

pub use backends::LlmBackend;
pub use chain::{Estimate, EstimationChain};
pub use config::{LlmProvider, ModelConfig};
pub use llm::LlmClient;
