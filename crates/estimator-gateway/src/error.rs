use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use estimator_core::EstimatorError;
use serde_json::json;
use tracing::{error, warn};

/// Error returned by gateway handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// The request body was malformed or missing a required field.
    BadRequest(String),
    /// A pipeline stage failed.
    Estimator(EstimatorError),
}

impl ApiError {
    /// HTTP status for this error.
    ///
    /// Invalid queries are the caller's fault (400). Failures of the embedding
    /// service, the vector store, or an upstream HTTP call are reported as 502.
    /// Everything else is a 500.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Estimator(EstimatorError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            ApiError::Estimator(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            ApiError::Estimator(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Estimator(e) => e.to_string(),
        }
    }
}

impl From<EstimatorError> for ApiError {
    fn from(e: EstimatorError) -> Self {
        ApiError::Estimator(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "Request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                EstimatorError::InvalidQuery("blank".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                EstimatorError::Embedding("down".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                EstimatorError::StoreQuery("down".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                EstimatorError::Http("503".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                EstimatorError::Completion("empty".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                EstimatorError::Config("no key".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err:?}");
        }
    }

    #[test]
    fn test_message_uses_error_display() {
        let err: ApiError = EstimatorError::StoreQuery("connection refused".into()).into();
        assert_eq!(err.message(), "Store query error: connection refused");
    }
}
