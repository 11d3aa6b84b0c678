//! Blocking HTTP byte fetching
//!
//! Fetches the raw bytes behind a URI and streams them into any writer
//! through a small fixed-size buffer. Transport failures and non-2xx
//! statuses are errors; interpreting the bytes is the caller's concern.

mod error;
mod fetcher;

pub use error::{FetchError, Result};
pub use fetcher::{BlobFetcher, FetchSource, IO_BUFFER_SIZE};
