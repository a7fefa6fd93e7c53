//! Cache TTL configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default TTL for general cache entries: 5 minutes.
const fn default_ttl_secs() -> u64 {
    300
}

/// Default TTL for resolved subject mappings: 30 minutes.
///
/// Mappings change rarely (a course re-shuffle, a new assignment), so they
/// earn a longer lifetime than general entries.
const fn default_subject_ttl_secs() -> u64 {
    1800
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TTL in seconds applied by plain `set` calls.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// TTL in seconds for cached subject resolutions.
    #[serde(default = "default_subject_ttl_secs")]
    pub subject_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            subject_ttl_secs: default_subject_ttl_secs(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    #[must_use]
    pub const fn subject_ttl(&self) -> Duration {
        Duration::from_secs(self.subject_ttl_secs)
    }
}
