//! # folio-cache
//!
//! Time-bounded caching of opaque byte payloads, used to hold rendered pages.
//!
//! ```rust
//! use folio_cache::{Cache, CacheConfig, MemoryBackend};
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let backend = MemoryBackend::new(CacheConfig::default());
//! let cache = Cache::with_default_ttl(backend, Duration::from_secs(20));
//! cache.put("greeting", &"hello".to_string()).await.unwrap();
//! let value: Option<String> = cache.get("greeting").await.unwrap();
//! assert_eq!(value.as_deref(), Some("hello"));
//! # });
//! ```

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod backends;
pub mod config;

pub use backends::MemoryBackend;
pub use config::{CacheConfig, CacheConfigBuilder};

/// Cache operation errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Storage every cache implementation provides.
///
/// Values are opaque bytes. An entry whose TTL has elapsed behaves exactly
/// like a missing one.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value from the cache
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Put a value in the cache; `None` uses the backend's default TTL
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()>;

    /// Remove a value from the cache
    async fn forget(&self, key: &str) -> CacheResult<bool>;

    /// Check if a live entry exists for `key`
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Clear all entries from the cache
    async fn flush(&self) -> CacheResult<()>;

    /// Get cache statistics (if supported)
    async fn stats(&self) -> CacheResult<CacheStats> {
        Ok(CacheStats::default())
    }
}

#[async_trait]
impl<B: CacheBackend + ?Sized> CacheBackend for std::sync::Arc<B> {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        (**self).put(key, value, ttl).await
    }

    async fn forget(&self, key: &str) -> CacheResult<bool> {
        (**self).forget(key).await
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        (**self).exists(key).await
    }

    async fn flush(&self) -> CacheResult<()> {
        (**self).flush().await
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        (**self).stats().await
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_keys: u64,
    pub memory_usage: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Typed front-end over a backend, storing values as JSON
#[derive(Clone)]
pub struct Cache<B: CacheBackend> {
    backend: B,
    default_ttl: Option<Duration>,
}

impl<B: CacheBackend> Cache<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            default_ttl: None,
        }
    }

    pub fn with_default_ttl(backend: B, ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl: Some(ttl),
        }
    }

    /// Get a typed value from the cache
    pub async fn get<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.backend.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Put a typed value in the cache for the default TTL
    pub async fn put<T>(&self, key: &str, value: &T) -> CacheResult<()>
    where
        T: Serialize,
    {
        let bytes = serde_json::to_vec(value)?;
        self.backend.put(key, bytes, self.default_ttl).await
    }

    pub async fn flush(&self) -> CacheResult<()> {
        self.backend.flush().await
    }

    pub async fn stats(&self) -> CacheResult<CacheStats> {
        self.backend.stats().await
    }
}
