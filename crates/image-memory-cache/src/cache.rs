//! Size-weighted LRU cache of decoded images

use crate::types::MemoryCacheStats;
use image_decode::DecodedImage;
use resource_key::ResourceKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

struct Entry {
    image: Arc<DecodedImage>,
    weight: usize,
    last_used: u64,
}

struct Inner {
    entries: HashMap<ResourceKey, Entry>,
    weight_bytes: usize,
    // Monotonic recency counter; bumped on every get and insert.
    tick: u64,
    stats: MemoryCacheStats,
}

/// Thread-safe in-memory image cache with size-weighted LRU eviction.
///
/// Callers receive shared references to resident images; the cache keeps
/// ownership of the entries themselves.
pub struct ImageMemoryCache {
    inner: Mutex<Inner>,
    capacity_bytes: usize,
}

impl ImageMemoryCache {
    /// Create a cache holding at most `capacity_bytes` of decoded pixels.
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                weight_bytes: 0,
                tick: 0,
                stats: MemoryCacheStats::default(),
            }),
            capacity_bytes,
        }
    }

    /// Look up a resident image, marking it most recently used on a hit.
    pub fn get(&self, key: &ResourceKey) -> Option<Arc<DecodedImage>> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        inner.tick += 1;

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.last_used = inner.tick;
            inner.stats.hits += 1;
            Some(Arc::clone(&entry.image))
        } else {
            inner.stats.misses += 1;
            None
        }
    }

    /// Insert an image if the key is currently absent.
    ///
    /// Returns `false` without touching the resident entry when the key is
    /// already present: the first writer wins for the lifetime of the cache.
    /// Least-recently-used entries are evicted until the new image fits. An
    /// image heavier than the whole capacity is still accepted once eviction
    /// has emptied the cache, temporarily exceeding the capacity for that
    /// single entry.
    pub fn put_if_absent(&self, key: ResourceKey, image: Arc<DecodedImage>) -> bool {
        let weight = image.weight();
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        if inner.entries.contains_key(&key) {
            return false;
        }

        while inner.weight_bytes + weight > self.capacity_bytes && !inner.entries.is_empty() {
            evict_one(inner);
        }

        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.insert(
            key,
            Entry {
                image,
                weight,
                last_used: tick,
            },
        );
        inner.weight_bytes += weight;
        inner.stats.entries = inner.entries.len();
        inner.stats.weight_bytes = inner.weight_bytes;
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of resident entry weights in bytes.
    pub fn weight_bytes(&self) -> usize {
        self.inner.lock().unwrap().weight_bytes
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn stats(&self) -> MemoryCacheStats {
        self.inner.lock().unwrap().stats.clone()
    }
}

/// Remove the least recently used entry.
fn evict_one(inner: &mut Inner) {
    let victim = inner
        .entries
        .iter()
        .min_by_key(|(_, entry)| entry.last_used)
        .map(|(key, _)| key.clone());

    if let Some(key) = victim {
        if let Some(entry) = inner.entries.remove(&key) {
            inner.weight_bytes -= entry.weight;
            inner.stats.evictions += 1;
            inner.stats.entries = inner.entries.len();
            inner.stats.weight_bytes = inner.weight_bytes;
            debug!(key = %key, weight = entry.weight, "evicted image from memory cache");
        }
    }
}
