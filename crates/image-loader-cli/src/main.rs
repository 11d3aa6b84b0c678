//! Command-line front end for the tiered image loader
//!
//! Loads each URI given on the command line through the cache pipeline and
//! writes the decoded images as PNG files. Acts as the composition root: one
//! loader instance is built here and shared by every request.

mod error;

use crate::error::{CliError, Result};
use http_blob_fetch::BlobFetcher;
use image_decode::DecodedImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tiered_image_loader::{
    ImageLoader, ImageLoaderConfig, DEFAULT_DISK_BUDGET_BYTES, DEFAULT_MEMORY_BUDGET_BYTES,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter =
        EnvFilter::from_default_env().add_directive("image_loader_cli=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let uris: Vec<String> = std::env::args().skip(1).collect();
    if uris.is_empty() {
        return Err(CliError::Config(
            "usage: image-loader-cli <uri> [<uri>...]".to_string(),
        ));
    }

    // Load configuration from environment
    let settings = load_settings();
    info!("Cache dir: {:?}", settings.config.cache_dir);
    info!(
        "Memory budget: {} MB",
        settings.config.memory_budget_bytes / (1024 * 1024)
    );
    info!(
        "Disk budget: {} MB",
        settings.config.disk_budget_bytes / (1024 * 1024)
    );
    info!("Output dir: {:?}", settings.out_dir);

    std::fs::create_dir_all(&settings.out_dir)?;

    let fetcher = Arc::new(BlobFetcher::new(settings.config.fetch_timeout)?);
    // The single loader instance for this process; every URI goes through it.
    let loader = Arc::new(ImageLoader::new(settings.config, fetcher));

    let mut failures = 0usize;
    for (index, uri) in uris.iter().enumerate() {
        match loader
            .spawn_load(uri.as_str(), settings.req_width, settings.req_height)
            .await
        {
            Ok(Some(image)) => {
                let path = settings.out_dir.join(format!("{index:03}.png"));
                save_png(&image, &path)?;
                info!(
                    uri = %uri,
                    width = image.width(),
                    height = image.height(),
                    path = %path.display(),
                    "decoded image written"
                );
            }
            Ok(None) => {
                warn!(uri = %uri, "image could not be produced by any tier");
                failures += 1;
            }
            Err(err) => {
                warn!(uri = %uri, error = %err, "load task did not complete");
                failures += 1;
            }
        }
    }

    info!(
        memory = ?loader.memory_stats(),
        disk = ?loader.disk_stats(),
        "session cache stats"
    );

    if failures > 0 {
        return Err(CliError::Config(format!(
            "{failures} of {} resource(s) could not be loaded",
            uris.len()
        )));
    }
    Ok(())
}

struct Settings {
    config: ImageLoaderConfig,
    out_dir: PathBuf,
    req_width: u32,
    req_height: u32,
}

fn load_settings() -> Settings {
    let cache_dir = std::env::var("CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./cache/images"));

    let memory_budget_bytes = std::env::var("MEMORY_BUDGET_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MEMORY_BUDGET_BYTES);

    let disk_budget_bytes = std::env::var("DISK_BUDGET_BYTES")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_DISK_BUDGET_BYTES);

    let fetch_timeout_secs = std::env::var("FETCH_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(30);

    let out_dir = std::env::var("OUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./decoded"));

    let req_width = std::env::var("REQ_WIDTH")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    let req_height = std::env::var("REQ_HEIGHT")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    Settings {
        config: ImageLoaderConfig {
            cache_dir,
            memory_budget_bytes,
            disk_budget_bytes,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
        },
        out_dir,
        req_width,
        req_height,
    }
}

fn save_png(image: &DecodedImage, path: &Path) -> Result<()> {
    image.as_rgba().save(path)?;
    Ok(())
}
