//! Observability Metrics
//!
//! Prometheus metrics for TTS streams, LLM proxy calls and errors.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use medassist_core::StreamEvent;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::ServerError;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder
///
/// Safe to call more than once; later calls return the installed handle.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("Failed to install Prometheus recorder: {e}")))?;

    register_default_metrics();

    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

fn register_default_metrics() {
    counter!("medassist_tts_streams_total").absolute(0);
    for outcome in ["success", "failure", "cached"] {
        counter!("medassist_tts_chunks_total", "outcome" => outcome).absolute(0);
    }
    for mode in ["json", "stream"] {
        counter!("medassist_llm_requests_total", "mode" => mode).absolute(0);
    }
    for error_type in ["tts", "invalid_request", "upstream", "upstream_timeout", "cache", "internal"] {
        counter!("medassist_errors_total", "type" => error_type).absolute(0);
    }
}

pub fn record_tts_stream() {
    counter!("medassist_tts_streams_total").increment(1);
}

/// Count one dispatcher event
pub fn record_tts_event(event: &StreamEvent) {
    match event {
        StreamEvent::Chunk(result) => {
            let outcome = if result.from_cache {
                "cached"
            } else if result.succeeded {
                "success"
            } else {
                "failure"
            };
            counter!("medassist_tts_chunks_total", "outcome" => outcome).increment(1);
        }
        StreamEvent::Error { .. } => record_error("tts"),
        StreamEvent::Metadata { .. } | StreamEvent::Complete { .. } => {}
    }
}

pub fn record_tts_stream_duration(duration_secs: f64) {
    histogram!("medassist_tts_stream_duration_seconds").record(duration_secs);
}

pub fn record_llm_request(mode: &'static str) {
    counter!("medassist_llm_requests_total", "mode" => mode).increment(1);
}

pub fn record_llm_latency(duration_secs: f64) {
    histogram!("medassist_llm_duration_seconds").record(duration_secs);
}

pub fn record_error(error_type: &'static str) {
    counter!("medassist_errors_total", "type" => error_type).increment(1);
}

/// Metrics endpoint handler
pub async fn metrics_handler() -> impl IntoResponse {
    match get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medassist_core::{ChunkResult, TextChunk};

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let chunk = TextChunk::new(0, "Rest.");
        record_tts_stream();
        record_tts_event(&StreamEvent::Chunk(ChunkResult::success(&chunk, "A".into())));
        record_tts_event(&StreamEvent::Chunk(ChunkResult::failure(&chunk, "failed")));
        record_tts_event(&StreamEvent::Error { message: "boom".into() });
        record_tts_stream_duration(0.4);
        record_llm_request("json");
        record_llm_latency(1.2);
    }
}
