//! Decoded image type

use image::RgbaImage;

const BYTES_PER_PIXEL: usize = 4;

/// A fully decoded RGBA image.
///
/// The pixel buffer is row-major RGBA8. `weight()` is the resident byte size
/// estimate used by the memory tier: row stride times height.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: RgbaImage,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Bytes per pixel row.
    pub fn row_stride(&self) -> usize {
        self.image.width() as usize * BYTES_PER_PIXEL
    }

    /// Resident byte size estimate (row stride x height).
    pub fn weight(&self) -> usize {
        self.row_stride() * self.image.height() as usize
    }

    /// Raw RGBA8 pixel buffer, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }
}

impl From<RgbaImage> for DecodedImage {
    fn from(image: RgbaImage) -> Self {
        Self { image }
    }
}
