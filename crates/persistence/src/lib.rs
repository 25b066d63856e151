//! Persistence layer for medassist
//!
//! Provides storage for converted TTS audio, keyed by chunk text and voice,
//! so repeated requests skip the vendor round trip.

pub mod audio_cache;
pub mod error;

pub use audio_cache::{cache_key, AudioCache, CacheStats, MemoryAudioCache};
pub use error::PersistenceError;
