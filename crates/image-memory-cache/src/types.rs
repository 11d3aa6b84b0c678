//! Memory cache statistics

use serde::{Deserialize, Serialize};

/// Counters describing memory-tier behavior since construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCacheStats {
    pub entries: usize,
    pub weight_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}
