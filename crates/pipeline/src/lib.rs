//! Text-to-speech pipeline
//!
//! This crate provides the chunked TTS proxy core:
//! - Sentence-aligned text chunking
//! - Vendor chunk conversion over HTTP
//! - Ordered streaming dispatch of concurrent conversions

pub mod tts;

pub use tts::{
    extract_audio_payload, DispatcherConfig, EventReceiver, SentenceChunker, StreamingDispatcher,
    VendorTtsConverter,
};

use medassist_persistence::PersistenceError;
use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Event stream closed")]
    ChannelClosed,

    #[error("Cache error: {0}")]
    Cache(#[from] PersistenceError),

    #[error("HTTP client error: {0}")]
    Client(String),
}
