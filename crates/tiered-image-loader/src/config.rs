//! Loader configuration

use std::path::PathBuf;
use std::time::Duration;

/// The memory tier receives this fraction of the configured memory budget.
pub const MEMORY_CACHE_FRACTION: usize = 8;

pub const DEFAULT_MEMORY_BUDGET_BYTES: usize = 512 * 1024 * 1024;
pub const DEFAULT_DISK_BUDGET_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for an [`crate::ImageLoader`].
///
/// Everything the loader needs arrives here at construction; there is no
/// process-global state to consult.
#[derive(Debug, Clone)]
pub struct ImageLoaderConfig {
    /// Directory backing the disk tier.
    pub cache_dir: PathBuf,
    /// Overall memory budget; the decoded-image tier is sized to 1/8 of it.
    pub memory_budget_bytes: usize,
    /// Byte budget of the disk tier.
    pub disk_budget_bytes: u64,
    /// Per-request timeout for network fetches.
    pub fetch_timeout: Duration,
}

impl Default for ImageLoaderConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache/images"),
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES, // 512 MiB
            disk_budget_bytes: DEFAULT_DISK_BUDGET_BYTES,     // 50 MiB
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}
