//! Seams between the dispatcher and upstream services

use async_trait::async_trait;

/// Converts one chunk of text to an audio payload
///
/// Implementations never fail loudly: any upstream, network or decoding
/// problem is reported as `None`.
#[async_trait]
pub trait ChunkConverter: Send + Sync {
    /// Convert `text` using `voice`, returning the encoded audio
    async fn convert(&self, text: &str, voice: &str) -> Option<String>;

    /// Name used in logs
    fn name(&self) -> &str {
        "converter"
    }
}
