//! Per-location rate limit policy.

use serde::{Deserialize, Serialize};

/// One limiter backed by a shared memory zone.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Zone {
    /// Zone name shared across the whole configuration.
    pub name: String,

    /// Shared memory size in megabytes.
    pub shared_size_mb: i64,

    /// Ceiling. Non-positive disables the limiter.
    pub limit: i64,

    pub burst: i64,
}

impl Zone {
    pub fn is_active(&self) -> bool {
        self.limit > 0
    }
}

/// Up to three independent limiters plus bandwidth throttling.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitPolicy {
    /// Policy identifier; also the suffix of the `$limit_<id>` key variable.
    pub id: String,

    /// Concurrent connections per key.
    pub connections: Zone,

    /// Requests per second per key.
    pub rps: Zone,

    /// Requests per minute per key.
    pub rpm: Zone,

    /// Response bandwidth ceiling in KB/s.
    pub limit_rate_kbps: i64,

    /// Kilobytes sent before `limit_rate` kicks in.
    pub limit_rate_after_kb: i64,

    /// Client CIDRs exempt from every limiter of the policy.
    pub whitelist: Vec<String>,
}
