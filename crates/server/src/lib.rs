//! MedAssist Server
//!
//! HTTP endpoints for the chunked TTS stream, the LLM chat proxy and
//! audio cache maintenance.

pub mod http;
pub mod metrics;
pub mod sse;
pub mod state;

pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use medassist_llm::LlmError;
use medassist_persistence::PersistenceError;
use medassist_pipeline::PipelineError;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    UpstreamTimeout(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Cache error: {0}")]
    Cache(#[from] PersistenceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Cache(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label for the error counter
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::UpstreamTimeout(_) => "upstream_timeout",
            ServerError::Upstream(_) => "upstream",
            ServerError::Cache(_) => "cache",
            ServerError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::record_error(self.kind());

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<LlmError> for ServerError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidRequest(message) => ServerError::InvalidRequest(message),
            LlmError::Timeout(_) => ServerError::UpstreamTimeout(err.to_string()),
            LlmError::Upstream { .. } => ServerError::Upstream(err.to_string()),
            LlmError::Http(ref e) if e.is_timeout() => ServerError::UpstreamTimeout(err.to_string()),
            LlmError::Http(_) => ServerError::Upstream(err.to_string()),
            LlmError::MissingApiKey => ServerError::Internal(err.to_string()),
        }
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Cache(e) => ServerError::Cache(e),
            other => ServerError::Internal(other.to_string()),
        }
    }
}
