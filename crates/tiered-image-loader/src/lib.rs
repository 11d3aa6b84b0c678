//! Tiered get-or-populate pipeline for remote images
//!
//! Composes the in-memory image cache, the persistent blob cache and an HTTP
//! fetch source into a single `load` call: memory first, then disk (with a
//! bounded decode), then a network fetch that populates the disk tier and is
//! re-read from it, and finally an uncached full-resolution fetch when the
//! disk tier never became available.
//!
//! `load` performs blocking I/O and belongs on a worker thread;
//! [`ImageLoader::spawn_load`] dispatches it onto the tokio blocking pool and
//! returns a cancellable join handle.

mod config;
mod loader;

pub use config::{
    ImageLoaderConfig, DEFAULT_DISK_BUDGET_BYTES, DEFAULT_FETCH_TIMEOUT,
    DEFAULT_MEMORY_BUDGET_BYTES, MEMORY_CACHE_FRACTION,
};
pub use loader::ImageLoader;
