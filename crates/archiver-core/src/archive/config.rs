//! Configuration for the archiver service.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for cache sizing, the wait protocol, and the stats reporter.
///
/// # Wait Protocol
///
/// A lookup that finds its block inside a bundle another task is fetching checks the cache up
/// to `retry_attempts` times, waiting at most `retry_interval_ms` before each check. The
/// longest a caller can wait is therefore `retry_attempts * retry_interval_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Archive endpoint, used for both JSON-RPC and the bundle name REST call
    pub rpc_address: String,
    /// Capacity of each of the number→hash, hash→body and hash→header caches (default: 5000)
    pub block_cache_size: usize,
    /// Cache checks while waiting on a concurrent bundle fetch (default: 3)
    pub retry_attempts: u32,
    /// Longest wait before each check, in milliseconds (default: 2000)
    pub retry_interval_ms: u64,
    /// Cache occupancy reporting interval in seconds (default: 10, 0 to disable)
    pub stats_interval_seconds: u64,
    /// Per-request timeout for archive calls in seconds (default: 600)
    pub request_timeout_seconds: u64,
    /// Largest bundle, in blocks, the archive may report before it is rejected (default: 10000)
    pub max_bundle_blocks: u64,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            rpc_address: String::new(),
            block_cache_size: 5000,
            retry_attempts: 3,
            retry_interval_ms: 2000,
            stats_interval_seconds: 10,
            request_timeout_seconds: 600,
            max_bundle_blocks: 10_000,
        }
    }
}

impl ArchiverConfig {
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    #[must_use]
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_seconds > 0).then(|| Duration::from_secs(self.stats_interval_seconds))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
