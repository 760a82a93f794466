//! Decoded pixel data owned by textures.

use crate::backend::CompressedFormat;
use crate::error::{GraphicsError, GraphicsResult};

#[cfg(feature = "image-decoding")]
use image::{DynamicImage, GenericImageView};
#[cfg(feature = "image-decoding")]
use std::path::Path;

/// Raw pixels are always RGBA8.
pub const BYTES_PER_PIXEL: usize = 4;

/// Uncompressed RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> GraphicsResult<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if width == 0 || height == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "image dimensions must be non-zero, got {width}x{height}"
            )));
        }
        if pixels.len() != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "{width}x{height} image needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode an image file
    #[cfg(feature = "image-decoding")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> GraphicsResult<Self> {
        let img = image::open(path.as_ref())
            .map_err(|e| GraphicsError::InvalidParameter(e.to_string()))?;
        Self::from_image(img)
    }

    /// Decode an encoded image held in memory
    #[cfg(feature = "image-decoding")]
    pub fn from_bytes(bytes: &[u8]) -> GraphicsResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| GraphicsError::InvalidParameter(e.to_string()))?;
        Self::from_image(img)
    }

    #[cfg(feature = "image-decoding")]
    fn from_image(img: DynamicImage) -> GraphicsResult<Self> {
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();
        Self::new(width, height, rgba.into_raw())
    }

    /// An image filled with one color
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> GraphicsResult<Self> {
        let pixels = color.repeat(width as usize * height as usize);
        Self::new(width, height, pixels)
    }

    /// Two-color checkerboard with 8 pixel cells
    pub fn checkerboard(
        width: u32,
        height: u32,
        color1: [u8; 4],
        color2: [u8; 4],
    ) -> GraphicsResult<Self> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
        for y in 0..height {
            for x in 0..width {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                pixels.extend_from_slice(if is_even { &color1 } else { &color2 });
            }
        }
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// One mip level of a block-compressed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedLevel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Block-compressed image with one or more mip levels, largest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImageData {
    format: CompressedFormat,
    levels: Vec<CompressedLevel>,
}

impl CompressedImageData {
    pub fn new(format: CompressedFormat, levels: Vec<CompressedLevel>) -> GraphicsResult<Self> {
        if levels.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "compressed image has no levels".to_string(),
            ));
        }
        if levels.iter().any(|l| l.width == 0 || l.height == 0) {
            return Err(GraphicsError::InvalidParameter(
                "compressed image level with zero size".to_string(),
            ));
        }
        Ok(Self { format, levels })
    }

    pub fn format(&self) -> CompressedFormat {
        self.format
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> Option<&CompressedLevel> {
        self.levels.get(level)
    }

    pub fn levels(&self) -> &[CompressedLevel] {
        &self.levels
    }

    pub fn width(&self, level: usize) -> Option<u32> {
        self.level(level).map(|l| l.width)
    }

    pub fn height(&self, level: usize) -> Option<u32> {
        self.level(level).map(|l| l.height)
    }

    pub fn byte_size(&self, level: usize) -> Option<usize> {
        self.level(level).map(|l| l.data.len())
    }

    pub fn data(&self, level: usize) -> Option<&[u8]> {
        self.level(level).map(|l| l.data.as_slice())
    }

    /// Whether the levels reach down to 1x1.
    pub fn has_full_chain(&self) -> bool {
        self.levels
            .last()
            .is_some_and(|l| l.width == 1 && l.height == 1)
    }

    fn base(&self) -> &CompressedLevel {
        // `new` guarantees at least one level.
        &self.levels[0]
    }
}

/// The pixel data a texture is created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelSource {
    Raw(ImageData),
    Compressed(CompressedImageData),
}

impl PixelSource {
    pub fn width(&self) -> u32 {
        match self {
            Self::Raw(image) => image.width(),
            Self::Compressed(image) => image.base().width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Raw(image) => image.height(),
            Self::Compressed(image) => image.base().height,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed(_))
    }

    pub fn is_power_of_two(&self) -> bool {
        self.width().is_power_of_two() && self.height().is_power_of_two()
    }
}

impl From<ImageData> for PixelSource {
    fn from(image: ImageData) -> Self {
        Self::Raw(image)
    }
}

impl From<CompressedImageData> for PixelSource {
    fn from(image: CompressedImageData) -> Self {
        Self::Compressed(image)
    }
}
