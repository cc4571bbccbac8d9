//! Cache settings.

use std::time::Duration;

const DEFAULT_CAPACITY: usize = 256;

/// Settings for the permission cache.
///
/// With the `serde` feature these deserialize from a settings file:
///
/// ```toml
/// use_object_caches = true
/// capacity = 512
/// ttl_secs = 300
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheSettings {
    /// Serve queries from cached snapshots. When off, every query hits the store.
    pub use_object_caches: bool,
    /// Maximum number of instances kept in memory. Zero disables caching.
    pub capacity: usize,
    /// Optional snapshot lifetime in seconds, on top of timestamp checks.
    pub ttl_secs: Option<u64>,
}

impl CacheSettings {
    /// Returns the configured time-to-live.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            use_object_caches: true,
            capacity: DEFAULT_CAPACITY,
            ttl_secs: None,
        }
    }
}
