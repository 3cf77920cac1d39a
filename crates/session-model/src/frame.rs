//! Camera frames.

use std::time::Instant;

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Number of interleaved channels in every frame buffer.
pub const FRAME_CHANNELS: u32 = 3;

/// One captured image sample with its capture instant.
///
/// Frames are handed between components by value; cloning copies the pixel
/// buffer so no two owners ever share a mutable frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// When the frame was read from the device.
    pub captured_at: Instant,

    /// Packed 8-bit RGB pixels.
    pub image: RgbImage,
}

impl Frame {
    /// Wrap an image captured now.
    pub fn new(image: RgbImage) -> Self {
        Self {
            captured_at: Instant::now(),
            image,
        }
    }

    /// A uniformly filled frame, mostly useful for tests and placeholders.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw pixel bytes (row-major, tightly packed).
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Copy of the frame normalized to `width x height`.
    ///
    /// Frames that already have the requested size are copied unchanged.
    pub fn resized(&self, width: u32, height: u32) -> RgbImage {
        if self.width() == width && self.height() == height {
            return self.image.clone();
        }
        imageops::resize(&self.image, width, height, FilterType::Triangle)
    }
}
