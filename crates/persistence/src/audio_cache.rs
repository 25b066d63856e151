//! Audio cache
//!
//! Stores converted audio per (chunk text, voice) pair.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::PersistenceError;

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entry_count: usize,
    #[serde(rename = "totalSizeKB")]
    pub total_size_kb: f64,
}

/// Audio cache trait for abstraction
#[async_trait]
pub trait AudioCache: Send + Sync {
    async fn get(&self, text: &str, voice: &str) -> Result<Option<String>, PersistenceError>;
    async fn put(&self, text: &str, voice: &str, audio: &str) -> Result<(), PersistenceError>;
    async fn stats(&self) -> Result<CacheStats, PersistenceError>;
    /// Remove entries created more than `older_than_days` ago
    async fn cleanup(&self, older_than_days: u32) -> Result<usize, PersistenceError>;
    async fn clear_all(&self) -> Result<usize, PersistenceError>;
    /// Remove the entries for each of `texts` spoken with `voice`
    async fn clear_for(&self, texts: &[String], voice: &str) -> Result<usize, PersistenceError>;
}

/// Cache key: hex SHA-256 over voice and text
pub fn cache_key(text: &str, voice: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(voice.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct CachedAudio {
    audio: String,
    created_at: DateTime<Utc>,
}

/// In-process audio cache
///
/// Bounded by entry count; inserting at capacity evicts the oldest entry.
pub struct MemoryAudioCache {
    capacity: usize,
    entries: RwLock<HashMap<String, CachedAudio>>,
}

impl MemoryAudioCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn insert_at(&self, text: &str, voice: &str, audio: &str, created_at: DateTime<Utc>) {
        let key = cache_key(text, voice);
        let mut entries = self.entries.write();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                tracing::debug!("Evicted oldest audio cache entry");
            }
        }

        entries.insert(
            key,
            CachedAudio {
                audio: audio.to_string(),
                created_at,
            },
        );
    }
}

impl Default for MemoryAudioCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl AudioCache for MemoryAudioCache {
    async fn get(&self, text: &str, voice: &str) -> Result<Option<String>, PersistenceError> {
        let key = cache_key(text, voice);
        Ok(self.entries.read().get(&key).map(|entry| entry.audio.clone()))
    }

    async fn put(&self, text: &str, voice: &str, audio: &str) -> Result<(), PersistenceError> {
        if audio.is_empty() {
            return Err(PersistenceError::InvalidData(
                "refusing to cache empty audio".to_string(),
            ));
        }
        self.insert_at(text, voice, audio, Utc::now());
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, PersistenceError> {
        let entries = self.entries.read();
        let total_bytes: usize = entries.values().map(|entry| entry.audio.len()).sum();

        Ok(CacheStats {
            entry_count: entries.len(),
            total_size_kb: total_bytes as f64 / 1024.0,
        })
    }

    async fn cleanup(&self, older_than_days: u32) -> Result<usize, PersistenceError> {
        let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at >= cutoff);
        let deleted = before - entries.len();

        tracing::info!(deleted, older_than_days, "Audio cache cleanup");
        Ok(deleted)
    }

    async fn clear_all(&self) -> Result<usize, PersistenceError> {
        let mut entries = self.entries.write();
        let deleted = entries.len();
        entries.clear();
        Ok(deleted)
    }

    async fn clear_for(&self, texts: &[String], voice: &str) -> Result<usize, PersistenceError> {
        let mut entries = self.entries.write();
        let deleted = texts
            .iter()
            .filter(|text| entries.remove(&cache_key(text, voice)).is_some())
            .count();
        Ok(deleted)
    }
}
