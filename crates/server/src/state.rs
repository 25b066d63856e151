//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use medassist_config::Settings;
use medassist_core::ChunkConverter;
use medassist_llm::ChatCompletionClient;
use medassist_persistence::{AudioCache, MemoryAudioCache};
use medassist_pipeline::{DispatcherConfig, StreamingDispatcher, VendorTtsConverter};

use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub dispatcher: Arc<StreamingDispatcher>,
    pub llm: Arc<ChatCompletionClient>,
    pub cache: Arc<dyn AudioCache>,
}

impl AppState {
    /// Build state backed by the vendor converter and an in-process cache
    pub fn new(config: Settings) -> Result<Self, ServerError> {
        let converter = VendorTtsConverter::new(&config.tts)?;
        let cache = Arc::new(MemoryAudioCache::new(config.cache.max_entries));
        Ok(Self::with_components(config, Arc::new(converter), cache))
    }

    /// Build state from explicit converter and cache
    pub fn with_components(
        config: Settings,
        converter: Arc<dyn ChunkConverter>,
        cache: Arc<dyn AudioCache>,
    ) -> Self {
        let mut dispatcher = StreamingDispatcher::new(converter, DispatcherConfig::from(&config.tts));
        if config.cache.enabled {
            dispatcher = dispatcher.with_cache(Arc::clone(&cache));
        }

        Self {
            llm: Arc::new(ChatCompletionClient::new(config.llm.clone())),
            dispatcher: Arc::new(dispatcher),
            cache,
            config: Arc::new(config),
        }
    }
}
