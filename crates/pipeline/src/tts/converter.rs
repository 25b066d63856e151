//! Vendor chunk converter
//!
//! Posts one chunk to the TTS vendor as a form and pulls the audio payload
//! out of the JSON envelope it answers with.

use std::time::Duration;

use async_trait::async_trait;
use medassist_config::TtsConfig;
use medassist_core::ChunkConverter;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde_json::Value;

use crate::PipelineError;

/// HTTP converter for the form-based TTS vendor
pub struct VendorTtsConverter {
    client: reqwest::Client,
    endpoint: String,
}

impl VendorTtsConverter {
    /// Build a converter from TTS settings
    ///
    /// Origin, referer and user agent are fixed per client since the vendor
    /// checks them on every call.
    pub fn new(config: &TtsConfig) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, header_value(&config.origin)?);
        headers.insert(REFERER, header_value(&config.referer)?);

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers);

        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| PipelineError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn header_value(value: &str) -> Result<HeaderValue, PipelineError> {
    HeaderValue::from_str(value)
        .map_err(|e| PipelineError::Client(format!("invalid header value '{value}': {e}")))
}

#[async_trait]
impl ChunkConverter for VendorTtsConverter {
    async fn convert(&self, text: &str, voice: &str) -> Option<String> {
        let response = match self
            .client
            .post(&self.endpoint)
            .form(&[("selectedVoiceValue", voice), ("text", text)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, voice, "TTS vendor request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), voice, "TTS vendor returned error status");
            return None;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read TTS vendor response");
                return None;
            }
        };

        let audio = extract_audio_payload(&body);
        if audio.is_none() {
            tracing::warn!(body_len = body.len(), "TTS vendor response had no audio payload");
        }
        audio
    }

    fn name(&self) -> &str {
        "vendor-tts"
    }
}

/// Pull the audio payload out of a vendor envelope
///
/// The envelope is `{"type": "success", "data": ...}` where `data` is an
/// array or a JSON string encoding one. The audio is the non-empty string
/// at position 2.
pub fn extract_audio_payload(body: &str) -> Option<String> {
    let envelope: Value = serde_json::from_str(body).ok()?;

    if envelope.get("type").and_then(Value::as_str) != Some("success") {
        return None;
    }

    let data = match envelope.get("data")? {
        Value::String(encoded) => serde_json::from_str::<Value>(encoded).ok()?,
        other => other.clone(),
    };

    data.as_array()?
        .get(2)?
        .as_str()
        .filter(|audio| !audio.is_empty())
        .map(str::to_string)
}
