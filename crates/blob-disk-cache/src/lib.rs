//! Persistent bounded blob cache
//!
//! Stores one payload file per resource key inside a cache directory, bounded
//! by a fixed byte budget with size-weighted LRU eviction. Writes go through
//! a handle that publishes atomically on commit and discards on abort or
//! drop, so a partially written blob is never observable. An index journal
//! records entries and their recency order; `flush()` persists it, and
//! reopening reconciles the journal against the payload files actually on
//! disk.

mod cache;
mod error;
mod journal;
mod types;

pub use cache::{BlobDiskCache, WriteHandle};
pub use error::{DiskCacheError, Result};
pub use types::DiskCacheStats;
