#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use estimator_agent::{EstimationChain, LlmBackend, LlmClient};
use estimator_core::{EstimatorError, EstimatorResult, Message, Metadata};
use estimator_retrieval::{
    EmbeddingProvider, InMemoryVectorStore, LocalEmbedding, QueryResponse, Retriever,
    StoredRecord, VectorStore,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

use estimator_gateway::GatewayServer;

/// Answers every prompt with a fixed estimate, or fails when `answer` is None.
struct CannedBackend {
    answer: Option<String>,
}

#[async_trait]
impl LlmBackend for CannedBackend {
    async fn chat(
        &self,
        _system_prompt: Option<&str>,
        _messages: &[Message],
    ) -> EstimatorResult<String> {
        self.answer
            .clone()
            .ok_or_else(|| EstimatorError::Completion("no content".to_string()))
    }
}

struct UnreachableStore;

#[async_trait]
impl VectorStore for UnreachableStore {
    async fn query(&self, _embedding: &[f32], _limit: usize) -> EstimatorResult<QueryResponse> {
        Err(EstimatorError::StoreQuery("connection refused".to_string()))
    }
}

async fn seeded_store(embedder: &LocalEmbedding) -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new());
    let projects = [
        ("crm_0", "customer portal login with single sign on", 0.9, 24),
        ("crm_1", "single sign on for the admin dashboard", 0.6, 16),
        ("etl_0", "nightly batch import of supplier invoices", 0.8, 60),
        ("etl_1", "invoice reconciliation report export", 0.7, 30),
    ];
    for (id, text, confidence, hours) in projects {
        let mut metadata = Metadata::new();
        metadata.insert("confidence".to_string(), json!(confidence));
        metadata.insert("effort_hours".to_string(), json!(hours));
        store
            .insert(StoredRecord {
                id: id.to_string(),
                text: text.to_string(),
                embedding: embedder.embed(text).await.unwrap(),
                metadata,
            })
            .await;
    }
    store
}

async fn serve(chain: EstimationChain) -> String {
    let app = GatewayServer::build(Arc::new(chain));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", addr.port())
}

/// Helper: start a server over the seeded in-memory store.
async fn start_test_server(answer: Option<&str>) -> String {
    let embedder = Arc::new(LocalEmbedding::default());
    let store = seeded_store(&embedder).await;
    let retriever = Arc::new(Retriever::new(embedder, store));
    let llm = LlmClient::from_backend(Box::new(CannedBackend {
        answer: answer.map(ToString::to_string),
    }));
    serve(EstimationChain::new(retriever, llm)).await
}

async fn post(base: &str, path: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let base = start_test_server(Some("ok")).await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "estimator");
}

#[tokio::test]
async fn test_retrieve_returns_ranked_results() {
    let base = start_test_server(Some("ok")).await;
    let resp = post(
        &base,
        "/api/retrieve",
        json!({"requirement": "single sign on login", "roughEffortHours": 20, "topK": 2}),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    let scores: Vec<f64> = results
        .iter()
        .map(|r| r["finalScore"].as_f64().unwrap())
        .collect();
    assert!(scores[0] >= scores[1]);
    for result in results {
        assert!(result["id"].as_str().unwrap().starts_with("crm_"));
        assert!(result["metadata"]["score"].is_number());
    }
}

#[tokio::test]
async fn test_retrieve_uses_default_top_k() {
    let base = start_test_server(Some("ok")).await;
    let resp = post(&base, "/api/retrieve", json!({"requirement": "invoice import"})).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_estimate_returns_text_and_sources() {
    let base = start_test_server(Some("Estimate: 3 days")).await;
    let resp = post(
        &base,
        "/api/estimate",
        json!({"requirement": "nightly invoice import", "topK": 2}),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["estimate"], "Estimate: 3 days");
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert!(sources[0]["snippet"].is_string());
    assert!(sources[0]["finalScore"].is_number());
    assert!(sources[0].get("text").is_none());
}

#[tokio::test]
async fn test_blank_requirement_is_bad_request() {
    let base = start_test_server(Some("ok")).await;
    for path in ["/api/retrieve", "/api/estimate"] {
        let resp = post(&base, path, json!({"requirement": "   "})).await;
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("requirement"));
    }
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let base = start_test_server(Some("ok")).await;
    let resp = post(&base, "/api/retrieve", json!({"requirement": 42})).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_invalid_query_is_bad_request() {
    let base = start_test_server(Some("ok")).await;
    let resp = post(
        &base,
        "/api/retrieve",
        json!({"requirement": "login", "topK": 0}),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid query"));
}

#[tokio::test]
async fn test_zero_effort_hint_ranks_like_no_hint() {
    let base = start_test_server(Some("ok")).await;
    let without: serde_json::Value = post(
        &base,
        "/api/retrieve",
        json!({"requirement": "invoice import", "topK": 2}),
    )
    .await
    .json()
    .await
    .unwrap();

    for hint in [json!(0), json!(-4), json!(null)] {
        let resp = post(
            &base,
            "/api/retrieve",
            json!({"requirement": "invoice import", "roughEffortHours": hint, "topK": 2}),
        )
        .await;
        assert_eq!(resp.status(), 200, "hint {hint}");
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body, without, "hint {hint}");
    }
}

#[tokio::test]
async fn test_store_failure_is_bad_gateway() {
    let retriever = Arc::new(Retriever::new(
        Arc::new(LocalEmbedding::default()),
        Arc::new(UnreachableStore),
    ));
    let llm = LlmClient::from_backend(Box::new(CannedBackend {
        answer: Some("unused".to_string()),
    }));
    let base = serve(EstimationChain::new(retriever, llm)).await;

    let resp = post(&base, "/api/estimate", json!({"requirement": "login"})).await;
    assert_eq!(resp.status(), 502);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

#[tokio::test]
async fn test_completion_failure_is_internal_error() {
    let base = start_test_server(None).await;
    let resp = post(&base, "/api/estimate", json!({"requirement": "login"})).await;
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Completion error"));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let base = start_test_server(Some("ok")).await;
    let resp = reqwest::Client::new()
        .get(format!("{base}/health"))
        .header("Origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .unwrap()
            .to_str()
            .unwrap(),
        "*"
    );
}
