//! Decoding of encoded image bytes into RGBA images
//!
//! Provides a bounded decode that downsamples by powers of two until the
//! result fits inside requested dimensions, and an unbounded full-resolution
//! decode for callers that cannot know a target size up front.

mod decode;
mod error;
mod types;

pub use decode::{decode_bounded, decode_unbounded};
pub use error::{DecodeError, Result};
pub use types::DecodedImage;
