//! Core types shared by the medassist crates
//!
//! - Chunk and result types produced by the TTS pipeline
//! - The stream event model written to clients
//! - The converter seam between the dispatcher and upstream vendors
//! - Error types

pub mod chunk;
pub mod error;
pub mod event;
pub mod traits;

pub use chunk::{ChunkResult, TextChunk};
pub use error::{Error, Result};
pub use event::StreamEvent;
pub use traits::ChunkConverter;
