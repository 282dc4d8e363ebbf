use crate::router::{estimate_handler, retrieve_handler};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use estimator_agent::EstimationChain;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    pub chain: Arc<EstimationChain>,
    /// `topK` used when a request omits it.
    pub default_top_k: usize,
}

/// The HTTP gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router; the retriever's configured default `topK` applies
    /// to requests that omit it.
    pub fn build(chain: Arc<EstimationChain>) -> Router {
        let default_top_k = chain.retriever().config().default_top_k;
        Self::build_with_state(AppState {
            chain,
            default_top_k,
        })
    }

    pub fn build_with_state(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/api/retrieve", post(retrieve_handler))
            .route("/api/estimate", post(estimate_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
            .with_state(Arc::new(state))
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "estimator"}))
}
