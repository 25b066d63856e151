//! HTTP Endpoints
//!
//! REST and event-stream API for TTS streaming, the LLM proxy and the
//! audio cache.

use std::collections::BTreeSet;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Json, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use medassist_config::Settings;
use medassist_llm::ChatProxyRequest;
use medassist_persistence::CacheStats;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::sse::{sse_response, tts_event_frames};
use crate::state::AppState;
use crate::{metrics, ServerError};

const DEFAULT_CLEANUP_DAYS: u32 = 7;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/api/tts/stream", post(tts_stream))
        .route("/api/llm/chat", post(llm_chat))
        // Audio cache maintenance
        .route("/api/tts/cache", delete(clear_cache))
        .route("/api/tts/cache/stats", get(cache_stats))
        .route("/api/tts/cache/cleanup", post(cleanup_cache))
        .route("/api/tts/cache/clear", post(clear_cache_for_texts))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Settings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

/// Stream synthesized audio for a text, chunk by chunk
async fn tts_stream(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Json(body) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;

    let text = match body.get("text") {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        _ => {
            return Err(ServerError::InvalidRequest(
                "text must be a non-empty string".to_string(),
            ))
        }
    };

    let voice = match body.get("voice") {
        None | Some(Value::Null) => state.config.tts.default_voice.clone(),
        Some(Value::String(voice)) if !voice.trim().is_empty() => voice.clone(),
        Some(Value::String(_)) => state.config.tts.default_voice.clone(),
        Some(_) => {
            return Err(ServerError::InvalidRequest(
                "voice must be a string".to_string(),
            ))
        }
    };

    let stream_id = Uuid::new_v4();
    tracing::info!(%stream_id, voice = %voice, text_len = text.chars().count(), "TTS stream requested");
    metrics::record_tts_stream();

    let events = state.dispatcher.dispatch(text, voice);
    Ok(sse_response(tts_event_frames(events, stream_id)))
}

/// Proxy a chat completion, as JSON or as an event stream
async fn llm_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatProxyRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Json(body) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let request = body.resolve()?;

    let mode = if request.streaming { "stream" } else { "json" };
    metrics::record_llm_request(mode);
    tracing::info!(
        model = request.model.as_deref().unwrap_or(&state.config.llm.default_model),
        shape = request.shape.label(),
        mode,
        "LLM chat requested"
    );

    let started = Instant::now();
    if request.streaming {
        let frames = state.llm.stream(&request).await?;
        metrics::record_llm_latency(started.elapsed().as_secs_f64());
        Ok(sse_response(frames))
    } else {
        let completion = state.llm.complete(&request).await?;
        metrics::record_llm_latency(started.elapsed().as_secs_f64());
        Ok(Json(completion).into_response())
    }
}

async fn cache_stats(State(state): State<AppState>) -> Result<Json<CacheStats>, ServerError> {
    Ok(Json(state.cache.stats().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CleanupRequest {
    #[serde(default = "default_cleanup_days")]
    older_than_days: u32,
}

fn default_cleanup_days() -> u32 {
    DEFAULT_CLEANUP_DAYS
}

/// Remove entries older than `olderThanDays`
///
/// An empty body uses the default age.
async fn cleanup_cache(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ServerError> {
    let older_than_days = if body.iter().all(u8::is_ascii_whitespace) {
        DEFAULT_CLEANUP_DAYS
    } else {
        serde_json::from_slice::<CleanupRequest>(&body)
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?
            .older_than_days
    };

    let deleted = state.cache.cleanup(older_than_days).await?;
    Ok(Json(json!({ "deletedCount": deleted, "olderThanDays": older_than_days })))
}

async fn clear_cache(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    let deleted = state.cache.clear_all().await?;
    tracing::info!(deleted, "Audio cache cleared");
    Ok(Json(json!({ "deletedCount": deleted })))
}

#[derive(Debug, Deserialize)]
struct ClearTextsRequest {
    texts: Vec<String>,
    #[serde(default)]
    voice: Option<String>,
}

/// Remove cached audio for specific texts
///
/// Entries are stored per chunk, so each text is chunked the same way a
/// stream would chunk it. The raw text is cleared too.
async fn clear_cache_for_texts(
    State(state): State<AppState>,
    payload: Result<Json<ClearTextsRequest>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    if request.texts.is_empty() {
        return Err(ServerError::InvalidRequest("texts must not be empty".to_string()));
    }

    let voice = request
        .voice
        .filter(|voice| !voice.trim().is_empty())
        .unwrap_or_else(|| state.config.tts.default_voice.clone());

    let chunker = state.dispatcher.chunker();
    let keys: BTreeSet<String> = request
        .texts
        .iter()
        .flat_map(|text| {
            chunker
                .split(text)
                .into_iter()
                .map(|chunk| chunk.text)
                .chain(std::iter::once(text.clone()))
        })
        .collect();
    let keys: Vec<String> = keys.into_iter().collect();

    let deleted = state.cache.clear_for(&keys, &voice).await?;
    Ok(Json(json!({ "deletedCount": deleted })))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let llm_configured = state
        .config
        .llm
        .api_key
        .as_deref()
        .is_some_and(|key| !key.is_empty());

    Json(json!({
        "status": "ready",
        "llmConfigured": llm_configured,
        "cacheEnabled": state.config.cache.enabled,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_creation() {
        let state = AppState::new(Settings::default()).unwrap();
        let _ = create_router(state);
    }

    #[test]
    fn test_cors_with_explicit_origins() {
        let mut settings = Settings::default();
        settings.server.cors_origins = vec!["https://app.example.com".to_string()];
        let _ = cors_layer(&settings);
    }
}
