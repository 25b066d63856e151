//! Stream events written to TTS clients
//!
//! A stream is exactly one `Metadata`, then one `Chunk` per input chunk in
//! index order, then `Complete`. A fatal orchestration failure ends the
//! stream with a single `Error` instead of `Complete`.

use serde::{Deserialize, Serialize};

use crate::chunk::{ChunkResult, TextChunk};

/// Event emitted by the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Sent first so clients can render placeholders
    #[serde(rename_all = "camelCase")]
    Metadata {
        total_chunks: usize,
        chunks: Vec<TextChunk>,
    },
    /// One resolved chunk
    Chunk(ChunkResult),
    /// All chunks emitted
    #[serde(rename_all = "camelCase")]
    Complete { total_chunks: usize },
    /// Orchestration failed
    Error { message: String },
}

impl StreamEvent {
    pub fn metadata(chunks: &[TextChunk]) -> Self {
        Self::Metadata {
            total_chunks: chunks.len(),
            chunks: chunks.to_vec(),
        }
    }

    /// Wire name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Metadata { .. } => "metadata",
            Self::Chunk(_) => "chunk",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// True for `Complete` and `Error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// Format as a server-sent event frame: `data: <json>\n\n`
    pub fn to_sse_frame(&self) -> crate::Result<String> {
        let payload = serde_json::to_string(self)?;
        Ok(format!("data: {payload}\n\n"))
    }
}
