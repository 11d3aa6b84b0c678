//! Bounded and unbounded decode entry points

use crate::error::Result;
use crate::types::DecodedImage;
use image::imageops::FilterType;

/// Decode image bytes and downsample so the result fits inside
/// `max_width` x `max_height`.
///
/// The downsampling factor is the smallest power of two that brings both
/// dimensions within the bounds, so the output stays memory-bounded without
/// resampling artifacts from arbitrary ratios. The image is never upsampled;
/// a zero bound disables bounding for that call.
pub fn decode_bounded(bytes: &[u8], max_width: u32, max_height: u32) -> Result<DecodedImage> {
    let decoded = image::load_from_memory(bytes)?.into_rgba8();
    if max_width == 0 || max_height == 0 {
        return Ok(DecodedImage::from(decoded));
    }

    let factor = sample_factor(decoded.width(), decoded.height(), max_width, max_height);
    if factor == 1 {
        return Ok(DecodedImage::from(decoded));
    }

    let width = (decoded.width() / factor).max(1);
    let height = (decoded.height() / factor).max(1);
    let resized = image::imageops::resize(&decoded, width, height, FilterType::Triangle);
    Ok(DecodedImage::from(resized))
}

/// Decode image bytes at full resolution.
///
/// Used by the no-disk-cache fallback path, where no target dimensions are
/// known.
pub fn decode_unbounded(bytes: &[u8]) -> Result<DecodedImage> {
    let decoded = image::load_from_memory(bytes)?.into_rgba8();
    Ok(DecodedImage::from(decoded))
}

/// Smallest power of two such that `width / factor <= max_width` and
/// `height / factor <= max_height`.
fn sample_factor(width: u32, height: u32, max_width: u32, max_height: u32) -> u32 {
    let mut factor = 1u32;
    while width / factor > max_width || height / factor > max_height {
        factor *= 2;
    }
    factor
}
