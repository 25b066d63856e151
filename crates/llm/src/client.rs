//! Chat-completion client
//!
//! Thin wrapper over an OpenAI-compatible `/chat/completions` endpoint.
//! Every upstream call is raced against the configured timeout.

use std::time::Duration;

use medassist_config::LlmConfig;
use serde::Serialize;
use serde_json::Value;

use crate::prompt::{ChatRequest, Message};
use crate::streaming::{relay_sse, FrameStream};
use crate::LlmError;

/// Longest upstream error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Body posted upstream
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamChatBody {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Chat-completion API client
#[derive(Clone)]
pub struct ChatCompletionClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl ChatCompletionClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    pub fn build_body(&self, request: &ChatRequest) -> UpstreamChatBody {
        UpstreamChatBody {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.default_model.clone()),
            messages: request.messages(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: request.streaming,
        }
    }

    /// Non-streaming call, returns the upstream JSON unchanged
    pub async fn complete(&self, request: &ChatRequest) -> Result<Value, LlmError> {
        let timeout = self.timeout();
        let secs = self.config.timeout_secs;

        tokio::time::timeout(timeout, async {
            let response = self.send(request).await?;
            Ok::<_, LlmError>(response.json::<Value>().await?)
        })
        .await
        .map_err(|_| LlmError::Timeout(secs))?
    }

    /// Streaming call, relays upstream `data:` lines
    ///
    /// The timeout covers the upstream response head. Once streaming has
    /// started, frames are relayed for as long as the upstream sends them.
    pub async fn stream(&self, request: &ChatRequest) -> Result<FrameStream, LlmError> {
        let response = tokio::time::timeout(self.timeout(), self.send(request))
            .await
            .map_err(|_| LlmError::Timeout(self.config.timeout_secs))??;

        Ok(relay_sse(response.bytes_stream()))
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        let body = self.build_body(request);
        tracing::debug!(
            model = %body.model,
            shape = request.shape.label(),
            stream = body.stream,
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| message.is_char_boundary(*i))
                    .unwrap_or(0);
                message.truncate(cut);
            }
            tracing::warn!(status = status.as_u16(), "LLM upstream returned error status");
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{ChatProxyRequest, PromptShape};
    use crate::DONE_FRAME;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::json;
    use tokio_stream::StreamExt;

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: String) -> ChatCompletionClient {
        ChatCompletionClient::new(LlmConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            ..LlmConfig::default()
        })
    }

    fn plain(streaming: bool) -> ChatRequest {
        ChatRequest {
            model: None,
            system_prompt: Some("Be brief.".to_string()),
            shape: PromptShape::Plain {
                prompt: "I have a cough.".to_string(),
            },
            streaming,
        }
    }

    #[test]
    fn test_build_body_uses_defaults() {
        let client = client_for("https://api.example.com/".to_string());
        let body = client.build_body(&plain(true));

        assert_eq!(client.endpoint(), "https://api.example.com/chat/completions");
        assert_eq!(body.model, "sonar");
        assert_eq!(body.messages.len(), 2);
        assert!(body.stream);
        assert_eq!(body.max_tokens, 2048);
    }

    #[test]
    fn test_build_body_keeps_requested_model() {
        let request = serde_json::from_value::<ChatProxyRequest>(json!({
            "model": "sonar-pro",
            "userPrompt": "hi"
        }))
        .unwrap()
        .resolve()
        .unwrap();

        let body = client_for("http://localhost".to_string()).build_body(&request);
        assert_eq!(body.model, "sonar-pro");
        assert!(!body.stream);
    }

    #[tokio::test]
    async fn test_complete_sends_bearer_and_returns_json() {
        let app = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({
                    "auth": auth,
                    "model": body["model"],
                    "messages": body["messages"].as_array().map(Vec::len),
                    "stream": body["stream"],
                }))
            }),
        );
        let client = client_for(spawn_upstream(app).await);

        let value = client.complete(&plain(false)).await.unwrap();

        assert_eq!(value["auth"], "Bearer test-key");
        assert_eq!(value["model"], "sonar");
        assert_eq!(value["messages"], 2);
        assert_eq!(value["stream"], false);
    }

    #[tokio::test]
    async fn test_stream_relays_and_terminates() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async {
                (
                    [("content-type", "text/event-stream")],
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Rest\"}}]}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\" well\"}}]}\n\n\
                     data: [DONE]\n\n",
                )
            }),
        );
        let client = client_for(spawn_upstream(app).await);

        let frames: Vec<String> = client.stream(&plain(true)).await.unwrap().collect().await;

        assert_eq!(frames.len(), 3);
        assert!(frames[0].contains("Rest"));
        assert!(frames[1].contains(" well"));
        assert_eq!(frames[2], DONE_FRAME);
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let client = client_for(spawn_upstream(app).await);

        match client.complete(&plain(false)).await {
            Err(LlmError::Upstream { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad key");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = ChatCompletionClient::new(LlmConfig {
            api_key: None,
            ..LlmConfig::default()
        });

        let err = client.complete(&plain(false)).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({}))
            }),
        );
        let client = ChatCompletionClient::new(LlmConfig {
            base_url: spawn_upstream(app).await,
            api_key: Some("test-key".to_string()),
            timeout_secs: 1,
            ..LlmConfig::default()
        });

        let err = client.stream(&plain(true)).await.err().unwrap();

        assert!(matches!(err, LlmError::Timeout(1)));
        assert_eq!(err.to_string(), "LLM upstream timed out after 1s");
    }
}
