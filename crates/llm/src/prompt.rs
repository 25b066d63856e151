//! Prompt shapes for the chat proxy
//!
//! Inbound requests come in three mutually exclusive shapes: a plain
//! prompt, a prompt with an image, or a prior conversation. They are
//! resolved once into [`PromptShape`] at the boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::LlmError;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// One part of a multi-part message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }

    fn is_image(&self) -> bool {
        matches!(self, Self::ImageUrl { image_url } if !image_url.url.trim().is_empty())
    }
}

/// Message content: plain text or parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(content: MessageContent) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}

/// Body accepted by the chat proxy route
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatProxyRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub user_prompt: Option<MessageContent>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub chat_history: Option<Vec<Message>>,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub has_image_url: bool,
}

/// Resolved prompt shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptShape {
    Plain { prompt: String },
    WithImage { parts: Vec<ContentPart> },
    WithHistory { history: Vec<Message> },
}

impl PromptShape {
    /// Label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Plain { .. } => "plain",
            Self::WithImage { .. } => "image",
            Self::WithHistory { .. } => "history",
        }
    }
}

/// Validated chat request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub shape: PromptShape,
    pub streaming: bool,
}

impl ChatProxyRequest {
    /// Resolve the body into exactly one prompt shape
    pub fn resolve(self) -> Result<ChatRequest, LlmError> {
        let shape = match (self.chat_history, self.has_image_url) {
            (Some(_), true) => {
                return Err(invalid("chatHistory cannot be combined with hasImageUrl"));
            }
            (Some(history), false) => {
                if self.user_prompt.is_some() {
                    return Err(invalid("chatHistory cannot be combined with userPrompt"));
                }
                if history.is_empty() {
                    return Err(invalid("chatHistory must not be empty"));
                }
                PromptShape::WithHistory { history }
            }
            (None, true) => image_shape(self.user_prompt, self.image_url)?,
            (None, false) => {
                if self.image_url.is_some() {
                    return Err(invalid("imageUrl requires hasImageUrl"));
                }
                match self.user_prompt {
                    Some(MessageContent::Text(prompt)) if !prompt.trim().is_empty() => {
                        PromptShape::Plain { prompt }
                    }
                    Some(MessageContent::Text(_)) => {
                        return Err(invalid("userPrompt must not be empty"));
                    }
                    Some(MessageContent::Parts(_)) => {
                        return Err(invalid("userPrompt content parts require hasImageUrl"));
                    }
                    None => return Err(invalid("userPrompt or chatHistory is required")),
                }
            }
        };

        Ok(ChatRequest {
            model: self.model.filter(|m| !m.trim().is_empty()),
            system_prompt: self.system_prompt.filter(|s| !s.trim().is_empty()),
            shape,
            streaming: self.streaming,
        })
    }
}

fn image_shape(
    user_prompt: Option<MessageContent>,
    image_url: Option<String>,
) -> Result<PromptShape, LlmError> {
    let image_url = image_url.filter(|url| !url.trim().is_empty());

    let mut parts = match user_prompt {
        Some(MessageContent::Parts(parts)) => parts,
        Some(MessageContent::Text(text)) => vec![ContentPart::text(text)],
        None => return Err(invalid("userPrompt is required with hasImageUrl")),
    };

    if let Some(url) = image_url {
        parts.push(ContentPart::image(url));
    }

    if !parts.iter().any(ContentPart::is_image) {
        return Err(invalid("hasImageUrl is set but no image URL was provided"));
    }

    Ok(PromptShape::WithImage { parts })
}

fn invalid(message: &str) -> LlmError {
    LlmError::InvalidRequest(message.to_string())
}

impl ChatRequest {
    /// Messages sent upstream: optional system prompt, then the shape
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }

        match &self.shape {
            PromptShape::Plain { prompt } => {
                messages.push(Message::user(MessageContent::Text(prompt.clone())));
            }
            PromptShape::WithImage { parts } => {
                messages.push(Message::user(MessageContent::Parts(parts.clone())));
            }
            PromptShape::WithHistory { history } => messages.extend(history.iter().cloned()),
        }

        messages
    }
}
