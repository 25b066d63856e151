//! Streaming Text-to-Speech
//!
//! Features:
//! - Sentence chunking bounded by a maximum length
//! - Concurrent per-chunk conversion against the vendor
//! - Results streamed back strictly in chunk order

mod chunker;
mod converter;
mod dispatcher;

pub use chunker::SentenceChunker;
pub use converter::{extract_audio_payload, VendorTtsConverter};
pub use dispatcher::{DispatcherConfig, EventReceiver, StreamingDispatcher};
