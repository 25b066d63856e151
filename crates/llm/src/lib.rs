//! LLM chat-completion proxy
//!
//! Resolves inbound chat requests into one of three prompt shapes and
//! forwards them to an OpenAI-compatible chat-completion API, either as a
//! single JSON response or as a relayed event stream.

pub mod client;
pub mod prompt;
pub mod streaming;

pub use client::{ChatCompletionClient, UpstreamChatBody};
pub use prompt::{
    ChatProxyRequest, ChatRequest, ContentPart, ImageUrl, Message, MessageContent, PromptShape,
    Role,
};
pub use streaming::{relay_sse, FrameStream, SseLineBuffer, DONE_FRAME};

use thiserror::Error;

/// LLM proxy errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("LLM API key is not configured")]
    MissingApiKey,

    #[error("LLM upstream timed out after {0}s")]
    Timeout(u64),

    #[error("LLM upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
