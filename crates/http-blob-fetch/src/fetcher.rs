//! HTTP client for fetching resource bytes

use crate::error::{FetchError, Result};
use reqwest::blocking::Client;
use std::io::{BufReader, Write};
use std::time::Duration;
use tracing::{debug, warn};

/// Copy buffer size for streaming response bodies.
pub const IO_BUFFER_SIZE: usize = 1024;

/// Source of raw resource bytes, keyed by URI.
///
/// The seam the cache pipeline fetches through; tests substitute their own
/// implementation.
pub trait FetchSource: Send + Sync {
    /// Stream the body behind `uri` into `dest`, returning the byte count.
    fn fetch_to(&self, uri: &str, dest: &mut dyn Write) -> Result<u64>;

    /// Fetch the whole body into memory.
    fn fetch_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.fetch_to(uri, &mut buf)?;
        Ok(buf)
    }
}

/// Blocking HTTP fetcher.
pub struct BlobFetcher {
    client: Client,
}

impl BlobFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl FetchSource for BlobFetcher {
    fn fetch_to(&self, uri: &str, dest: &mut dyn Write) -> Result<u64> {
        debug!(uri, "fetching resource");

        let response = self.client.get(uri).send()?;
        let status = response.status();
        if !status.is_success() {
            warn!(uri, status = %status, "fetch rejected by server");
            return Err(FetchError::Status(status));
        }

        let mut reader = BufReader::with_capacity(IO_BUFFER_SIZE, response);
        let bytes = std::io::copy(&mut reader, dest)?;
        debug!(uri, bytes, "fetched resource");
        Ok(bytes)
    }
}
