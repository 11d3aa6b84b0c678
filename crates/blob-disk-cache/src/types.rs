//! Disk cache statistics

use serde::{Deserialize, Serialize};

/// Counters describing disk-tier behavior since the cache was opened.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskCacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
}
