//! Cache configuration and builder

use serde::{Deserialize, Serialize};
use service_builder::builder;
use std::time::Duration;

/// Default lifetime of a cached page
pub const DEFAULT_TTL: Duration = Duration::from_secs(20);

/// Default cap on the number of live entries
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Cache configuration for the memory backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[builder]
pub struct CacheConfig {
    /// TTL applied when a write does not pick one
    #[builder(getter, default = "Some(DEFAULT_TTL)")]
    pub default_ttl: Option<Duration>,

    /// Maximum number of entries held at once
    #[builder(getter, default = "Some(DEFAULT_MAX_ENTRIES)")]
    pub max_entries: Option<usize>,

    /// Probability that a read also sweeps expired entries
    #[builder(getter, default = "0.01")]
    pub sweep_probability: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Some(DEFAULT_TTL),
            max_entries: Some(DEFAULT_MAX_ENTRIES),
            sweep_probability: 0.01,
        }
    }
}

// Convenience methods on the generated builder
impl CacheConfigBuilder {
    pub fn default_ttl_duration(self, ttl: Duration) -> Self {
        self.default_ttl(Some(ttl))
    }

    pub fn no_default_ttl(self) -> Self {
        self.default_ttl(None)
    }

    pub fn max_entries_limit(self, max: usize) -> Self {
        self.max_entries(Some(max))
    }

    pub fn unlimited_entries(self) -> Self {
        self.max_entries(None)
    }

    /// Never sweep on reads; expired entries still vanish on access
    pub fn without_sweeps(self) -> Self {
        self.sweep_probability(0.0)
    }

    pub fn build_config(self) -> CacheConfig {
        self.build_with_defaults().unwrap_or_default()
    }
}
