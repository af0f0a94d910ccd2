//! Two-tier validation cache.
//!
//! Lookups try the memory tier first, then the persistent tier; persistent
//! hits are promoted into memory. Keys are `{tier}:{content_hash}:{ctx}`
//! where `ctx` hashes the keyword set and the active thresholds, so a config
//! change can never serve stale results. Tier read failures degrade to
//! misses; the cache must never break a validation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;
use crate::store::{KvStore, MemoryStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    ValidationResult,
    ContentMetrics,
    KeywordAnalysis,
    ReadabilityAnalysis,
    TitleUniqueness,
}

impl CacheTier {
    pub const ALL: [CacheTier; 5] = [
        CacheTier::ValidationResult,
        CacheTier::ContentMetrics,
        CacheTier::KeywordAnalysis,
        CacheTier::ReadabilityAnalysis,
        CacheTier::TitleUniqueness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::ValidationResult => "validation_result",
            CacheTier::ContentMetrics => "content_metrics",
            CacheTier::KeywordAnalysis => "keyword_analysis",
            CacheTier::ReadabilityAnalysis => "readability_analysis",
            CacheTier::TitleUniqueness => "title_uniqueness",
        }
    }

    pub fn ttl(&self, config: &CacheConfig) -> Duration {
        let secs = match self {
            CacheTier::ValidationResult => config.validation_result_ttl_secs,
            CacheTier::ContentMetrics => config.content_metrics_ttl_secs,
            CacheTier::KeywordAnalysis => config.keyword_analysis_ttl_secs,
            CacheTier::ReadabilityAnalysis => config.readability_analysis_ttl_secs,
            CacheTier::TitleUniqueness => config.title_uniqueness_ttl_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Order-independent hash over keyword/config context parts.
pub fn context_hash(focus_keyword: &str, secondary_keywords: &[String], fingerprint: &str) -> String {
    let mut sorted: Vec<&str> = secondary_keywords.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(focus_keyword.as_bytes());
    for kw in sorted {
        hasher.update([0]);
        hasher.update(kw.as_bytes());
    }
    hasher.update([1]);
    hasher.update(fingerprint.as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub memory_hits: u64,
    pub persistent_hits: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct ValidationCache {
    memory: MemoryStore,
    persistent: Option<Arc<dyn KvStore>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    memory_hits: AtomicU64,
    persistent_hits: AtomicU64,
}

impl ValidationCache {
    pub fn new(config: CacheConfig) -> ValidationCache {
        ValidationCache {
            memory: MemoryStore::new(),
            persistent: None,
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            memory_hits: AtomicU64::new(0),
            persistent_hits: AtomicU64::new(0),
        }
    }

    pub fn with_persistent(config: CacheConfig, store: Arc<dyn KvStore>) -> ValidationCache {
        let mut cache = ValidationCache::new(config);
        cache.persistent = Some(store);
        cache
    }

    fn key(tier: CacheTier, content_hash: &str, ctx_hash: &str) -> String {
        format!("{}:{}:{}", tier.as_str(), content_hash, ctx_hash)
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        tier: CacheTier,
        content_hash: &str,
        ctx_hash: &str,
    ) -> Option<T> {
        let key = Self::key(tier, content_hash, ctx_hash);

        if let Ok(Some(raw)) = self.memory.get(&key) {
            if let Ok(value) = serde_json::from_str(&raw) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.memory_hits.fetch_add(1, Ordering::Relaxed);
                return Some(value);
            }
        }

        if let Some(persistent) = &self.persistent {
            if let Ok(Some(raw)) = persistent.get(&key) {
                if let Ok(value) = serde_json::from_str(&raw) {
                    // Promote into the memory tier with a fresh tier TTL.
                    let _ = self.memory.set(&key, &raw, tier.ttl(&self.config));
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    self.persistent_hits.fetch_add(1, Ordering::Relaxed);
                    return Some(value);
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn set<T: Serialize>(
        &self,
        tier: CacheTier,
        content_hash: &str,
        ctx_hash: &str,
        value: &T,
    ) -> anyhow::Result<()> {
        let key = Self::key(tier, content_hash, ctx_hash);
        let raw = serde_json::to_string(value)?;
        let ttl = tier.ttl(&self.config);
        self.memory.set(&key, &raw, ttl)?;
        if let Some(persistent) = &self.persistent {
            persistent.set(&key, &raw, ttl)?;
        }
        Ok(())
    }

    /// Drop every cached entry for one content hash, across all tiers and
    /// both stores. Returns the number of removed entries.
    pub fn purge_content(&self, content_hash: &str) -> anyhow::Result<usize> {
        let mut removed = 0;
        for tier in CacheTier::ALL {
            let prefix = format!("{}:{}:", tier.as_str(), content_hash);
            removed += self.memory.purge_prefix(&prefix)?;
            if let Some(persistent) = &self.persistent {
                removed += persistent.purge_prefix(&prefix)?;
            }
        }
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            persistent_hits: self.persistent_hits.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> String {
        context_hash("rust", &["speed".to_string()], "fp")
    }

    #[test]
    fn test_get_after_set() {
        let cache = ValidationCache::new(CacheConfig::default());
        cache
            .set(CacheTier::ContentMetrics, "hash1", &ctx(), &42u32)
            .unwrap();
        let value: Option<u32> = cache.get(CacheTier::ContentMetrics, "hash1", &ctx());
        assert_eq!(value, Some(42));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_miss_on_unknown_content() {
        let cache = ValidationCache::new(CacheConfig::default());
        let value: Option<u32> = cache.get(CacheTier::ContentMetrics, "nope", &ctx());
        assert_eq!(value, None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let config = CacheConfig {
            content_metrics_ttl_secs: 0,
            ..CacheConfig::default()
        };
        let cache = ValidationCache::new(config);
        cache
            .set(CacheTier::ContentMetrics, "hash1", &ctx(), &42u32)
            .unwrap();
        let value: Option<u32> = cache.get(CacheTier::ContentMetrics, "hash1", &ctx());
        assert_eq!(value, None);
    }

    #[test]
    fn test_tiers_do_not_collide() {
        let cache = ValidationCache::new(CacheConfig::default());
        cache
            .set(CacheTier::KeywordAnalysis, "hash1", &ctx(), &1u32)
            .unwrap();
        let other: Option<u32> = cache.get(CacheTier::ReadabilityAnalysis, "hash1", &ctx());
        assert_eq!(other, None);
    }

    #[test]
    fn test_persistent_hit_promotes_to_memory() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let writer = ValidationCache::with_persistent(CacheConfig::default(), Arc::clone(&store));
        writer
            .set(CacheTier::ValidationResult, "hash1", &ctx(), &7u32)
            .unwrap();

        // Fresh cache, cold memory tier, same persistent store.
        let reader = ValidationCache::with_persistent(CacheConfig::default(), store);
        let first: Option<u32> = reader.get(CacheTier::ValidationResult, "hash1", &ctx());
        assert_eq!(first, Some(7));
        assert_eq!(reader.stats().persistent_hits, 1);

        let second: Option<u32> = reader.get(CacheTier::ValidationResult, "hash1", &ctx());
        assert_eq!(second, Some(7));
        assert_eq!(reader.stats().memory_hits, 1);
    }

    #[test]
    fn test_purge_content_spares_other_hashes() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let cache = ValidationCache::with_persistent(CacheConfig::default(), store);
        cache
            .set(CacheTier::ContentMetrics, "hash1", &ctx(), &1u32)
            .unwrap();
        cache
            .set(CacheTier::KeywordAnalysis, "hash1", &ctx(), &2u32)
            .unwrap();
        cache
            .set(CacheTier::ContentMetrics, "hash2", &ctx(), &3u32)
            .unwrap();

        // Two tiers, two stores each.
        assert_eq!(cache.purge_content("hash1").unwrap(), 4);
        let gone: Option<u32> = cache.get(CacheTier::ContentMetrics, "hash1", &ctx());
        assert_eq!(gone, None);
        let kept: Option<u32> = cache.get(CacheTier::ContentMetrics, "hash2", &ctx());
        assert_eq!(kept, Some(3));
    }

    #[test]
    fn test_context_hash_ignores_secondary_order() {
        let a = context_hash("rust", &["a".to_string(), "b".to_string()], "fp");
        let b = context_hash("rust", &["b".to_string(), "a".to_string()], "fp");
        assert_eq!(a, b);
        let c = context_hash("rust", &["a".to_string(), "b".to_string()], "other");
        assert_ne!(a, c);
    }
}
