//! Bounded in-memory cache of decoded images
//!
//! Size-weighted LRU cache mapping resource keys to decoded images. Entries
//! are weighted by their resident byte size (row stride x height) and the
//! sum of resident weights is kept within a fixed capacity. Insertion is
//! first-writer-wins: an existing entry is never overwritten.

mod cache;
mod types;

pub use cache::ImageMemoryCache;
pub use types::MemoryCacheStats;
