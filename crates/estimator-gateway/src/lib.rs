//! HTTP gateway for the effort estimator.
//!
//! Exposes three JSON endpoints over axum:
//!
//! - `GET /health`: liveness check
//! - `POST /api/retrieve`: ranked past projects for a requirement
//! - `POST /api/estimate`: LLM estimate grounded on the ranked projects

pub mod error;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{EstimateRequest, EstimateResponse, RetrieveResponse, SourceView};
pub use server::{AppState, GatewayServer};
