use crate::llm::LlmClient;
use crate::prompt;
use estimator_core::{EstimatorResult, Message, QueryContext, ScoredRecord};
use estimator_retrieval::Retriever;
use std::sync::Arc;
use tracing::info;

/// Characters of each retrieved document shown in the retrieval log.
const LOG_SNIPPET_CHARS: usize = 150;

/// An LLM estimate together with the records it was grounded on.
#[derive(Debug, Clone)]
pub struct Estimate {
    pub text: String,
    pub sources: Vec<ScoredRecord>,
}

/// Retrieve-then-answer pipeline.
///
/// Records are retrieved once per request; the same list feeds the prompt and
/// is returned as the estimate's sources.
pub struct EstimationChain {
    retriever: Arc<Retriever>,
    llm: LlmClient,
}

impl EstimationChain {
    pub fn new(retriever: Arc<Retriever>, llm: LlmClient) -> Self {
        Self { retriever, llm }
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    pub async fn estimate(&self, context: &QueryContext) -> EstimatorResult<Estimate> {
        let sources = self.retriever.retrieve_with(context).await?;
        log_sources(&sources);

        let prompt = prompt::render(&context.query_text, &sources);
        let text = self.llm.chat(None, &[Message::user(prompt)]).await?;

        info!(
            sources = sources.len(),
            chars = text.len(),
            "Estimate generated"
        );
        Ok(Estimate { text, sources })
    }
}

fn log_sources(sources: &[ScoredRecord]) {
    for (idx, source) in sources.iter().enumerate() {
        let metadata = serde_json::to_string(source.metadata()).unwrap_or_default();
        let score = format!("{:.4}", source.final_score);
        info!(
            rank = idx + 1,
            id = source.id().unwrap_or("-"),
            score = %score,
            metadata = %metadata,
            snippet = source.record.snippet(LOG_SNIPPET_CHARS),
            "Retrieved document"
        );
    }
}
