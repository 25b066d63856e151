//! Ordered Streaming Dispatcher
//!
//! Fans out one conversion per chunk, then drains the pending results in
//! chunk order so the client always sees chunk events by increasing index.

use std::sync::Arc;
use std::time::Duration;

use medassist_config::TtsConfig;
use medassist_core::{ChunkConverter, ChunkResult, StreamEvent, TextChunk};
use futures::future::try_join_all;
use medassist_persistence::AudioCache;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::chunker::{SentenceChunker, DEFAULT_MAX_CHUNK_LENGTH};
use crate::PipelineError;

/// Receiving half of a dispatch
pub type EventReceiver = mpsc::UnboundedReceiver<StreamEvent>;

/// Dispatcher configuration
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Maximum characters per chunk
    pub max_chunk_length: usize,
    /// Delay between chunk events
    pub pacing: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: DEFAULT_MAX_CHUNK_LENGTH,
            pacing: Duration::from_millis(50),
        }
    }
}

impl From<&TtsConfig> for DispatcherConfig {
    fn from(config: &TtsConfig) -> Self {
        Self {
            max_chunk_length: config.max_chunk_length,
            pacing: Duration::from_millis(config.pacing_ms),
        }
    }
}

/// Result slot for one chunk
enum Pending {
    Cached(String),
    Converting(JoinHandle<Option<String>>),
}

/// Chunked TTS dispatcher
///
/// One dispatch per request; nothing mutable is shared between dispatches.
pub struct StreamingDispatcher {
    converter: Arc<dyn ChunkConverter>,
    cache: Option<Arc<dyn AudioCache>>,
    chunker: SentenceChunker,
    pacing: Duration,
}

impl StreamingDispatcher {
    pub fn new(converter: Arc<dyn ChunkConverter>, config: DispatcherConfig) -> Self {
        Self {
            converter,
            cache: None,
            chunker: SentenceChunker::new(config.max_chunk_length),
            pacing: config.pacing,
        }
    }

    /// Consult and fill `cache` during dispatch
    pub fn with_cache(mut self, cache: Arc<dyn AudioCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn chunker(&self) -> &SentenceChunker {
        &self.chunker
    }

    /// Start a dispatch in the background and return its event stream
    ///
    /// Dropping the receiver stops emission; conversions already started
    /// run to completion and their results are discarded.
    pub fn dispatch(self: &Arc<Self>, text: String, voice: String) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Arc::clone(self).run(text, voice, tx));
        rx
    }

    /// Run a dispatch to completion, writing events to `tx`
    ///
    /// Any failure escaping per-chunk handling, including a panic, ends the
    /// stream with one `Error` event and no `Complete`.
    pub async fn run(self: Arc<Self>, text: String, voice: String, tx: mpsc::UnboundedSender<StreamEvent>) {
        let sink = tx.clone();
        let this = Arc::clone(&self);
        let orchestration =
            tokio::spawn(async move { this.orchestrate(&text, &voice, &sink).await }).await;

        let failure = match orchestration {
            Ok(Ok(total_chunks)) => {
                tracing::debug!(total_chunks, "TTS dispatch complete");
                None
            }
            Ok(Err(PipelineError::ChannelClosed)) => {
                tracing::debug!("Client went away; dropping remaining TTS events");
                None
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(format!("Dispatcher task failed: {e}")),
        };

        if let Some(message) = failure {
            tracing::error!(error = %message, "TTS dispatch failed");
            let _ = tx.send(StreamEvent::Error { message });
        }
    }

    async fn orchestrate(
        &self,
        text: &str,
        voice: &str,
        tx: &mpsc::UnboundedSender<StreamEvent>,
    ) -> Result<usize, PipelineError> {
        let chunks = self.chunker.split(text);
        let total_chunks = chunks.len();
        tracing::info!(total_chunks, voice, converter = self.converter.name(), "Dispatching TTS chunks");

        emit(tx, StreamEvent::metadata(&chunks))?;

        let cached = match &self.cache {
            Some(cache) => {
                try_join_all(chunks.iter().map(|chunk| cache.get(&chunk.text, voice))).await?
            }
            None => vec![None; total_chunks],
        };

        let pending: Vec<Pending> = chunks
            .iter()
            .zip(cached)
            .map(|(chunk, hit)| match hit {
                Some(audio) => Pending::Cached(audio),
                None => Pending::Converting(self.spawn_conversion(chunk, voice)),
            })
            .collect();

        for (chunk, slot) in chunks.iter().zip(pending) {
            if chunk.index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            let result = self.resolve(chunk, voice, slot).await;
            if !result.succeeded {
                tracing::warn!(chunk_index = chunk.index, "TTS chunk failed");
            }
            emit(tx, StreamEvent::Chunk(result))?;
        }

        emit(tx, StreamEvent::Complete { total_chunks })?;
        Ok(total_chunks)
    }

    fn spawn_conversion(&self, chunk: &TextChunk, voice: &str) -> JoinHandle<Option<String>> {
        let converter = Arc::clone(&self.converter);
        let text = chunk.text.clone();
        let voice = voice.to_string();
        tokio::spawn(async move { converter.convert(&text, &voice).await })
    }

    async fn resolve(&self, chunk: &TextChunk, voice: &str, slot: Pending) -> ChunkResult {
        match slot {
            Pending::Cached(audio) => ChunkResult::cached(chunk, audio),
            Pending::Converting(handle) => match handle.await {
                Ok(Some(audio)) => {
                    self.store(chunk, voice, &audio).await;
                    ChunkResult::success(chunk, audio)
                }
                Ok(None) => ChunkResult::failure(chunk, "Audio conversion failed"),
                Err(e) => ChunkResult::failure(chunk, format!("Conversion task failed: {e}")),
            },
        }
    }

    async fn store(&self, chunk: &TextChunk, voice: &str, audio: &str) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&chunk.text, voice, audio).await {
                tracing::warn!(chunk_index = chunk.index, error = %e, "Failed to cache chunk audio");
            }
        }
    }
}

fn emit(tx: &mpsc::UnboundedSender<StreamEvent>, event: StreamEvent) -> Result<(), PipelineError> {
    tx.send(event).map_err(|_| PipelineError::ChannelClosed)
}
