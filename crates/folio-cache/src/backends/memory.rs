//! In-memory cache backend with TTL expiry

use crate::{CacheBackend, CacheConfig, CacheResult, CacheStats};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Entry in the memory cache
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            data,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |exp| Instant::now() >= exp)
    }

    fn size(&self) -> usize {
        self.data.len() + std::mem::size_of::<Self>()
    }
}

/// Process-local cache backend.
///
/// Expired entries are dropped lazily on access and by occasional sweeps.
/// When `max_entries` is reached, expired entries go first, then the entry
/// closest to expiry.
pub struct MemoryBackend {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    stats: Mutex<CacheStats>,
}

impl MemoryBackend {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Number of stored entries, including not yet swept expired ones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn at_capacity(&self) -> bool {
        self.config
            .get_max_entries()
            .map_or(false, |max| self.entries.len() >= max)
    }

    /// Remove every expired entry; returns how many were dropped
    fn sweep_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }

    /// Make room for one more entry
    fn evict(&self) {
        let swept = self.sweep_expired();
        if swept > 0 {
            debug!("cache evicted {} expired entries", swept);
        }

        while self.at_capacity() {
            let victim = self
                .entries
                .iter()
                .min_by_key(|entry| {
                    let expires_at = entry.value().expires_at;
                    (expires_at.is_none(), expires_at)
                })
                .map(|entry| entry.key().clone());
            match victim {
                Some(key) => {
                    debug!("cache evicting '{}' to stay under capacity", key);
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        if rand::random::<f64>() < *self.config.get_sweep_probability() {
            self.sweep_expired();
        }

        let data = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.data.clone()),
            Some(entry) => {
                drop(entry);
                self.entries.remove_if(key, |_, entry| entry.is_expired());
                None
            }
            None => None,
        };

        let mut stats = self.stats.lock();
        if data.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        Ok(data)
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        if !self.entries.contains_key(key) && self.at_capacity() {
            self.evict();
        }

        let ttl = ttl.or(*self.config.get_default_ttl());
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn forget(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return Ok(false),
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(!expired)
    }

    async fn flush(&self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }

    /// Key count and memory usage are measured here rather than on every write
    async fn stats(&self) -> CacheResult<CacheStats> {
        let mut stats = self.stats.lock().clone();
        stats.total_keys = self.entries.len() as u64;
        stats.memory_usage = self
            .entries
            .iter()
            .map(|entry| entry.value().size() as u64)
            .sum();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MemoryBackend {
        MemoryBackend::new(CacheConfig::builder().without_sweeps().build_config())
    }

    #[tokio::test]
    async fn test_put_get_forget() {
        let cache = backend();
        cache
            .put("key", b"value".to_vec(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(cache.get("key").await.unwrap(), Some(b"value".to_vec()));
        assert!(cache.forget("key").await.unwrap());
        assert!(!cache.forget("key").await.unwrap());
        assert_eq!(cache.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = backend();
        cache
            .put("ttl_key", b"value".to_vec(), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(cache.exists("ttl_key").await.unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!cache.exists("ttl_key").await.unwrap());
        assert_eq!(cache.get("ttl_key").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_entries_without_ttl_persist() {
        let cache = MemoryBackend::new(
            CacheConfig::builder()
                .no_default_ttl()
                .without_sweeps()
                .build_config(),
        );
        cache.put("forever", b"x".to_vec(), None).await.unwrap();
        assert!(cache.exists("forever").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_ttl_falls_back_to_default() {
        let cache = MemoryBackend::new(
            CacheConfig::builder()
                .default_ttl_duration(Duration::from_millis(50))
                .without_sweeps()
                .build_config(),
        );
        cache.put("page", b"x".to_vec(), None).await.unwrap();
        assert!(cache.exists("page").await.unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.get("page").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_read_keeps_fresh_rewrite() {
        let cache = backend();
        cache
            .put("page", b"old".to_vec(), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        cache
            .put("page", b"new".to_vec(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(cache.exists("page").await.unwrap());
        assert_eq!(cache.get("page").await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_capacity_evicts_soonest_expiring() {
        let cache = MemoryBackend::new(
            CacheConfig::builder()
                .max_entries_limit(2)
                .without_sweeps()
                .build_config(),
        );
        cache
            .put("short", b"1".to_vec(), Some(Duration::from_secs(10)))
            .await
            .unwrap();
        cache
            .put("long", b"2".to_vec(), Some(Duration::from_secs(600)))
            .await
            .unwrap();
        cache
            .put("new", b"3".to_vec(), Some(Duration::from_secs(300)))
            .await
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(!cache.exists("short").await.unwrap());
        assert!(cache.exists("long").await.unwrap());
        assert!(cache.exists("new").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let cache = MemoryBackend::new(
            CacheConfig::builder()
                .max_entries_limit(1)
                .without_sweeps()
                .build_config(),
        );
        cache.put("only", b"1".to_vec(), None).await.unwrap();
        cache.put("only", b"2".to_vec(), None).await.unwrap();
        assert_eq!(cache.get("only").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let cache = backend();
        cache.put("a", b"1".to_vec(), None).await.unwrap();
        cache.get("a").await.unwrap();
        cache.get("b").await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_keys, 1);
        assert!(stats.memory_usage > 0);
        assert_eq!(stats.hit_ratio(), 0.5);

        cache.flush().await.unwrap();
        assert_eq!(cache.stats().await.unwrap().total_keys, 0);
    }
}
