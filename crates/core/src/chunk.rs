//! Chunk types for the TTS pipeline

use serde::{Deserialize, Serialize};

/// A sentence-aligned segment of input text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Position in the original text, starting at 0
    pub index: usize,
    /// Text submitted for conversion
    pub text: String,
}

impl TextChunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Outcome of one chunk conversion attempt
///
/// Built once per chunk after its conversion resolves and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResult {
    pub index: usize,
    pub source_text: String,
    pub audio_payload: Option<String>,
    pub succeeded: bool,
    pub error_message: Option<String>,
    /// Served from the audio cache instead of the vendor
    #[serde(default)]
    pub from_cache: bool,
}

impl ChunkResult {
    /// Successful conversion
    pub fn success(chunk: &TextChunk, audio: String) -> Self {
        Self {
            index: chunk.index,
            source_text: chunk.text.clone(),
            audio_payload: Some(audio),
            succeeded: true,
            error_message: None,
            from_cache: false,
        }
    }

    /// Audio served from cache
    pub fn cached(chunk: &TextChunk, audio: String) -> Self {
        Self {
            from_cache: true,
            ..Self::success(chunk, audio)
        }
    }

    /// Failed conversion
    pub fn failure(chunk: &TextChunk, message: impl Into<String>) -> Self {
        Self {
            index: chunk.index,
            source_text: chunk.text.clone(),
            audio_payload: None,
            succeeded: false,
            error_message: Some(message.into()),
            from_cache: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_length_counts_chars() {
        let chunk = TextChunk::new(0, "Café.");
        assert_eq!(chunk.len(), 5);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_failure_has_no_audio() {
        let chunk = TextChunk::new(3, "Take rest.");
        let result = ChunkResult::failure(&chunk, "upstream returned 500");

        assert_eq!(result.index, 3);
        assert!(!result.succeeded);
        assert!(result.audio_payload.is_none());
        assert_eq!(result.error_message.as_deref(), Some("upstream returned 500"));
    }

    #[test]
    fn test_cached_result_is_success() {
        let chunk = TextChunk::new(0, "Drink fluids.");
        let result = ChunkResult::cached(&chunk, "UklGRg==".to_string());

        assert!(result.succeeded);
        assert!(result.from_cache);
        assert_eq!(result.source_text, "Drink fluids.");
    }
}
