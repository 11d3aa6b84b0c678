//! End-to-end pipeline behavior across the three tiers

use http_blob_fetch::{FetchSource, Result as FetchResult};
use image::{Rgba, RgbaImage};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tiered_image_loader::{ImageLoader, ImageLoaderConfig};

/// Fetcher serving one fixed payload (or failing when none is set), counting
/// how often it is asked.
struct StubFetcher {
    payload: Option<Vec<u8>>,
    calls: AtomicUsize,
}

impl StubFetcher {
    fn serving(payload: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            payload: Some(payload),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            payload: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FetchSource for StubFetcher {
    fn fetch_to(&self, _uri: &str, dest: &mut dyn Write) -> FetchResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.payload {
            Some(bytes) => {
                dest.write_all(bytes)?;
                Ok(bytes.len() as u64)
            }
            None => Err(std::io::Error::other("stub network down").into()),
        }
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encoding a test png");
    bytes
}

fn config_with_dir(dir: &Path) -> ImageLoaderConfig {
    ImageLoaderConfig {
        cache_dir: dir.to_path_buf(),
        memory_budget_bytes: 8 * 1024 * 1024,
        disk_budget_bytes: 1024 * 1024,
        fetch_timeout: Duration::from_secs(5),
    }
}

fn blob_file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| {
                    entry.path().extension().and_then(|ext| ext.to_str()) == Some("bin")
                })
                .count()
        })
        .unwrap_or(0)
}

#[test]
fn test_cold_load_populates_all_tiers_then_memory_serves() {
    let dir = tempdir().unwrap();
    let fetcher = StubFetcher::serving(png_bytes(64, 64));
    let loader = ImageLoader::new(config_with_dir(dir.path()), fetcher.clone());

    let first = loader
        .load("http://x/a.png", 16, 16)
        .expect("cold load succeeds");
    assert_eq!((first.width(), first.height()), (16, 16));
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(blob_file_count(dir.path()), 1, "blob committed to disk");
    assert_eq!(loader.memory_stats().entries, 1, "memory tier populated");

    let disk_stats_before = loader.disk_stats().unwrap();
    let second = loader
        .load("http://x/a.png", 16, 16)
        .expect("warm load succeeds");

    assert!(Arc::ptr_eq(&first, &second), "memory returns the same image");
    assert_eq!(fetcher.calls(), 1, "no second network fetch");
    let disk_stats_after = loader.disk_stats().unwrap();
    assert_eq!(
        disk_stats_before.hits + disk_stats_before.misses,
        disk_stats_after.hits + disk_stats_after.misses,
        "memory hit bypasses the disk tier"
    );
}

#[test]
fn test_disk_unavailable_decodes_full_resolution_uncached() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"plain file").unwrap();
    let cache_dir = blocker.join("cache");

    let fetcher = StubFetcher::serving(png_bytes(64, 48));
    let loader = ImageLoader::new(config_with_dir(&cache_dir), fetcher.clone());
    assert!(!loader.disk_available());

    let image = loader
        .load("http://x/a.png", 16, 16)
        .expect("uncached fallback succeeds");
    // No disk tier means no bounded decode: full resolution comes back.
    assert_eq!((image.width(), image.height()), (64, 48));
    assert!(!cache_dir.exists(), "no disk entry was created");

    // Nothing was populated, so a repeat load fetches again.
    loader.load("http://x/a.png", 16, 16).unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn test_corrupt_disk_entry_falls_through_to_network() {
    let dir = tempdir().unwrap();
    let uri = "http://x/corrupt-then-fine.png";

    // First run caches bytes that are not a decodable image.
    {
        let fetcher = StubFetcher::serving(b"these are not image bytes".to_vec());
        let loader = ImageLoader::new(config_with_dir(dir.path()), fetcher.clone());
        assert!(loader.load(uri, 16, 16).is_none());
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(blob_file_count(dir.path()), 1, "garbage still committed");
    }

    // Second run: disk holds the corrupt entry, the network has good bytes.
    let fetcher = StubFetcher::serving(png_bytes(64, 64));
    let loader = ImageLoader::new(config_with_dir(dir.path()), fetcher.clone());
    let image = loader
        .load(uri, 16, 16)
        .expect("network replaces the corrupt entry");
    assert_eq!((image.width(), image.height()), (16, 16));
    assert_eq!(fetcher.calls(), 1, "exactly one refetch");
}

#[test]
fn test_fetch_failure_with_disk_available_returns_none_without_writes() {
    let dir = tempdir().unwrap();
    let fetcher = StubFetcher::failing();
    let loader = ImageLoader::new(config_with_dir(dir.path()), fetcher.clone());

    assert!(loader.load("http://x/a.png", 16, 16).is_none());
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(blob_file_count(dir.path()), 0, "aborted write left nothing");
    assert_eq!(loader.memory_stats().entries, 0);
}

#[test]
fn test_fallback_exhaustion_without_disk() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"plain file").unwrap();
    let cache_dir = blocker.join("cache");

    let fetcher = StubFetcher::failing();
    let loader = ImageLoader::new(config_with_dir(&cache_dir), fetcher.clone());

    assert!(loader.load("http://x/a.png", 16, 16).is_none());
    // Only the uncached fallback fetch ran; the disk-populating step was
    // skipped outright.
    assert_eq!(fetcher.calls(), 1);
    assert!(!cache_dir.exists());
}

#[test]
fn test_restart_promotes_from_disk_without_network() {
    let dir = tempdir().unwrap();
    let uri = "http://x/persisted.png";

    {
        let fetcher = StubFetcher::serving(png_bytes(64, 64));
        let loader = ImageLoader::new(config_with_dir(dir.path()), fetcher);
        loader.load(uri, 16, 16).expect("initial population");
    }

    // Fresh loader, empty memory: the blob must come from disk alone.
    let fetcher = StubFetcher::failing();
    let loader = ImageLoader::new(config_with_dir(dir.path()), fetcher.clone());

    let first = loader.load(uri, 16, 16).expect("disk hit after restart");
    assert_eq!(fetcher.calls(), 0, "no network involved");
    assert_eq!(loader.disk_stats().unwrap().hits, 1);
    assert_eq!(loader.memory_stats().entries, 1, "disk hit promoted to memory");

    let second = loader.load(uri, 16, 16).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.disk_stats().unwrap().hits, 1, "served from memory");
}

#[test]
fn test_zero_bounds_load_full_resolution_through_disk() {
    let dir = tempdir().unwrap();
    let fetcher = StubFetcher::serving(png_bytes(64, 48));
    let loader = ImageLoader::new(config_with_dir(dir.path()), fetcher);

    let image = loader.load("http://x/raw.png", 0, 0).expect("load succeeds");
    assert_eq!((image.width(), image.height()), (64, 48));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawn_load_runs_on_blocking_pool() {
    let dir = tempdir().unwrap();
    let fetcher = StubFetcher::serving(png_bytes(64, 64));
    let loader = Arc::new(ImageLoader::new(config_with_dir(dir.path()), fetcher));

    let image = loader
        .spawn_load("http://x/async.png", 16, 16)
        .await
        .expect("task not cancelled")
        .expect("load succeeds");
    assert_eq!((image.width(), image.height()), (16, 16));
}
