//! The get-or-populate pipeline

use crate::config::{ImageLoaderConfig, MEMORY_CACHE_FRACTION};
use blob_disk_cache::{BlobDiskCache, DiskCacheStats};
use http_blob_fetch::FetchSource;
use image_decode::DecodedImage;
use image_memory_cache::{ImageMemoryCache, MemoryCacheStats};
use resource_key::ResourceKey;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use tracing::{debug, error, info, warn};

/// Tiered image loader: memory, then disk, then network.
///
/// One instance owns both cache tiers for its lifetime and is shared across
/// all callers; construct it once at the composition root and inject it.
/// Concurrent `load` calls for the same cold key fetch independently; there
/// is no single-flight deduplication. The disk tier's one-writer-per-key rule
/// bounds the damage to redundant work.
pub struct ImageLoader {
    memory: ImageMemoryCache,
    disk: Option<BlobDiskCache>,
    fetcher: Arc<dyn FetchSource>,
    latency_sensitive: Mutex<HashSet<ThreadId>>,
}

impl ImageLoader {
    /// Build a loader from explicit configuration.
    ///
    /// A disk tier that fails to open (insufficient free space, unusable
    /// directory) is logged and bypassed for the lifetime of the loader;
    /// the loader itself still works from memory and network.
    pub fn new(config: ImageLoaderConfig, fetcher: Arc<dyn FetchSource>) -> Self {
        let memory = ImageMemoryCache::new(config.memory_budget_bytes / MEMORY_CACHE_FRACTION);

        let disk = match BlobDiskCache::open(&config.cache_dir, config.disk_budget_bytes) {
            Ok(disk) => Some(disk),
            Err(err) => {
                warn!(
                    cache_dir = %config.cache_dir.display(),
                    error = %err,
                    "disk cache unavailable; continuing with memory and network only"
                );
                None
            }
        };

        info!(
            memory_capacity = memory.capacity_bytes(),
            disk_available = disk.is_some(),
            "image loader ready"
        );

        Self {
            memory,
            disk,
            fetcher,
            latency_sensitive: Mutex::new(HashSet::new()),
        }
    }

    /// Load the image behind `uri`, bounded to `req_width` x `req_height`
    /// (zero disables bounding).
    ///
    /// Tiers are consulted strictly in order and the first success wins.
    /// Ordinary failures (network, decode, disk I/O) are treated as misses
    /// for their tier; `None` means no tier could produce the image.
    ///
    /// Blocking: dispatch through [`ImageLoader::spawn_load`] or a worker
    /// thread. Reaching the network step from a thread marked latency
    /// sensitive is a programming error and panics.
    pub fn load(&self, uri: &str, req_width: u32, req_height: u32) -> Option<Arc<DecodedImage>> {
        let key = ResourceKey::from_uri(uri);

        if let Some(image) = self.memory.get(&key) {
            return Some(image);
        }

        if let Some(image) = self.load_from_disk(&key, req_width, req_height) {
            return Some(image);
        }

        if let Some(image) = self.load_via_network(&key, uri, req_width, req_height) {
            return Some(image);
        }

        // The disk tier never existed for this loader, so nothing could be
        // populated; fall back to a one-shot uncached fetch.
        if self.disk.is_none() {
            return self.download_uncached(uri);
        }

        None
    }

    /// Dispatch `load` onto the blocking pool, returning a cancellable
    /// handle to the result.
    pub fn spawn_load(
        self: &Arc<Self>,
        uri: impl Into<String>,
        req_width: u32,
        req_height: u32,
    ) -> tokio::task::JoinHandle<Option<Arc<DecodedImage>>> {
        let loader = Arc::clone(self);
        let uri = uri.into();
        tokio::task::spawn_blocking(move || loader.load(&uri, req_width, req_height))
    }

    /// Mark the calling thread as latency sensitive.
    ///
    /// Network fetches issued from a marked thread panic instead of silently
    /// blocking it; disk lookups log a warning.
    pub fn mark_current_thread_latency_sensitive(&self) {
        self.latency_sensitive
            .lock()
            .unwrap()
            .insert(thread::current().id());
    }

    pub fn memory_stats(&self) -> MemoryCacheStats {
        self.memory.stats()
    }

    /// `None` while the disk tier is unavailable.
    pub fn disk_stats(&self) -> Option<DiskCacheStats> {
        self.disk.as_ref().map(|disk| disk.stats())
    }

    pub fn disk_available(&self) -> bool {
        self.disk.is_some()
    }

    pub fn memory_capacity_bytes(&self) -> usize {
        self.memory.capacity_bytes()
    }

    /// Disk lookup plus bounded decode; a successful decode backfills the
    /// memory tier.
    fn load_from_disk(
        &self,
        key: &ResourceKey,
        req_width: u32,
        req_height: u32,
    ) -> Option<Arc<DecodedImage>> {
        let disk = self.disk.as_ref()?;

        if self.is_latency_sensitive_thread() {
            warn!(key = %key, "disk lookup issued from a latency-sensitive thread");
        }

        let blob = match disk.get(key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %key, error = %err, "disk read failed; treating as miss");
                return None;
            }
        };

        let image = match image_decode::decode_bounded(&blob, req_width, req_height) {
            Ok(image) => Arc::new(image),
            Err(err) => {
                warn!(key = %key, error = %err, "cached blob failed to decode");
                return None;
            }
        };

        // Population goes through this single path, so a resident entry can
        // only mean another loader call got here first.
        if self.memory.get(key).is_none() {
            self.memory.put_if_absent(key.clone(), Arc::clone(&image));
        }

        Some(image)
    }

    /// Stream the resource into the disk tier, then re-read it through the
    /// disk path exactly once.
    fn load_via_network(
        &self,
        key: &ResourceKey,
        uri: &str,
        req_width: u32,
        req_height: u32,
    ) -> Option<Arc<DecodedImage>> {
        self.assert_fetch_allowed(uri);

        let disk = self.disk.as_ref()?;

        match disk.begin_write(key) {
            Ok(Some(mut handle)) => {
                match self.fetcher.fetch_to(uri, &mut handle) {
                    Ok(bytes) => {
                        debug!(key = %key, bytes, "streamed resource into disk cache");
                        if let Err(err) = handle.commit() {
                            warn!(key = %key, error = %err, "disk commit failed");
                        }
                    }
                    Err(err) => {
                        warn!(uri, error = %err, "fetch failed; aborting disk write");
                        handle.abort();
                    }
                }
                if let Err(err) = disk.flush() {
                    warn!(error = %err, "disk journal flush failed");
                }
            }
            Ok(None) => {
                debug!(key = %key, "concurrent write in progress; skipping disk population")
            }
            Err(err) => warn!(key = %key, error = %err, "could not open disk write"),
        }

        self.load_from_disk(key, req_width, req_height)
    }

    /// Full-resolution fetch that populates nothing; only reached when the
    /// disk tier never became available.
    fn download_uncached(&self, uri: &str) -> Option<Arc<DecodedImage>> {
        self.assert_fetch_allowed(uri);

        let bytes = match self.fetcher.fetch_bytes(uri) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(uri, error = %err, "uncached fetch failed");
                return None;
            }
        };

        match image_decode::decode_unbounded(&bytes) {
            Ok(image) => Some(Arc::new(image)),
            Err(err) => {
                warn!(uri, error = %err, "fetched bytes failed to decode");
                None
            }
        }
    }

    fn is_latency_sensitive_thread(&self) -> bool {
        self.latency_sensitive
            .lock()
            .unwrap()
            .contains(&thread::current().id())
    }

    fn assert_fetch_allowed(&self, uri: &str) {
        if self.is_latency_sensitive_thread() {
            error!(uri, "network fetch attempted from a latency-sensitive thread");
            panic!("network fetch for {uri} issued from a latency-sensitive thread; dispatch load() to a worker instead");
        }
    }
}
