use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use estimator_core::{Metadata, QueryContext, ScoredRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Characters of document text returned with each estimate source.
pub const SOURCE_SNIPPET_CHARS: usize = 300;

/// Body accepted by both `/api/retrieve` and `/api/estimate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    #[serde(default)]
    pub requirement: Option<String>,
    #[serde(default)]
    pub rough_effort_hours: Option<f64>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl EstimateRequest {
    /// Turn the body into a query, filling `topK` from the server default.
    pub fn into_context(self, default_top_k: usize) -> Result<QueryContext, ApiError> {
        let requirement = self
            .requirement
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("requirement (string) is required".to_string()))?;

        Ok(QueryContext::new(requirement)
            .with_effort_hours(self.rough_effort_hours)
            .with_top_k(self.top_k.unwrap_or(default_top_k)))
    }
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub results: Vec<ScoredRecord>,
}

/// A ranked record as shown to API clients: metadata plus a text excerpt.
#[derive(Debug, Serialize)]
pub struct SourceView {
    pub id: Option<String>,
    pub metadata: Metadata,
    pub snippet: String,
    #[serde(rename = "finalScore")]
    pub final_score: f64,
}

impl From<&ScoredRecord> for SourceView {
    fn from(source: &ScoredRecord) -> Self {
        Self {
            id: source.record.id.clone(),
            metadata: source.record.metadata.clone(),
            snippet: source.record.snippet(SOURCE_SNIPPET_CHARS).to_string(),
            final_score: source.final_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub estimate: String,
    pub sources: Vec<SourceView>,
}

pub(crate) async fn retrieve_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let Json(request) = body?;
    let context = request.into_context(state.default_top_k)?;
    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        top_k = context.top_k,
        effort_hours = ?context.user_effort_hours,
        "Retrieve request"
    );

    let results = state.chain.retriever().retrieve_with(&context).await?;

    info!(request_id = %request_id, results = results.len(), "Retrieve completed");
    Ok(Json(RetrieveResponse { results }))
}

pub(crate) async fn estimate_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let Json(request) = body?;
    let context = request.into_context(state.default_top_k)?;
    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        top_k = context.top_k,
        effort_hours = ?context.user_effort_hours,
        "Estimate request"
    );

    let estimate = state.chain.estimate(&context).await?;

    info!(
        request_id = %request_id,
        sources = estimate.sources.len(),
        "Estimate completed"
    );
    Ok(Json(EstimateResponse {
        sources: estimate.sources.iter().map(SourceView::from).collect(),
        estimate: estimate.text,
    }))
}
