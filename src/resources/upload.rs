//! Capability-gated upload and mipmap strategy selection.
//!
//! Both selections look only at a capability snapshot and the pixel source,
//! so they can be decided (and tested) without a device.

use glam::Vec2;

use crate::backend::{DeviceCapabilities, MipmapGeneration};
use crate::error::{GraphicsError, GraphicsResult};

use super::pixels::PixelSource;

/// How level 0 of a texture is stored on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// Stored at its true size.
    Native,
    /// Stored in power-of-two storage with the image in the top-left corner.
    PaddedPowerOfTwo { width: u32, height: u32 },
}

impl UploadStrategy {
    pub fn select(caps: &DeviceCapabilities, source: &PixelSource) -> GraphicsResult<Self> {
        if let PixelSource::Compressed(image) = source {
            if !caps.supports_compressed(image.format()) {
                return Err(GraphicsError::UnsupportedFormat(format!(
                    "{} compressed images are not supported on this device",
                    image.format().name()
                )));
            }
        }

        if caps.npot || source.is_power_of_two() {
            return Ok(Self::Native);
        }
        if source.is_compressed() {
            return Err(GraphicsError::UnsupportedFormat(
                "non-power-of-two compressed images are not supported on this device".to_string(),
            ));
        }
        Ok(Self::PaddedPowerOfTwo {
            width: source.width().next_power_of_two(),
            height: source.height().next_power_of_two(),
        })
    }

    /// Size of the device storage for an image of the given size.
    pub fn storage_size(&self, width: u32, height: u32) -> (u32, u32) {
        match *self {
            Self::Native => (width, height),
            Self::PaddedPowerOfTwo { width, height } => (width, height),
        }
    }

    /// Factor mapping nominal texture coordinates onto the storage.
    pub fn uv_scale(&self, width: u32, height: u32) -> Vec2 {
        let (storage_width, storage_height) = self.storage_size(width, height);
        Vec2::new(
            width as f32 / storage_width as f32,
            height as f32 / storage_height as f32,
        )
    }
}

/// How the mip chain of a loaded texture is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipmapStrategy {
    /// Upload the precomputed compressed levels 1..n.
    CompressedLevels {
        /// Highest level the sampler may use, when the device can be told.
        max_level: Option<u32>,
    },
    /// Re-upload the base level and ask the device to build the chain.
    NativeGenerate,
    /// Enable automatic generation and re-upload the base level.
    LegacyAutoGenerate,
}

impl MipmapStrategy {
    pub fn select(caps: &DeviceCapabilities, source: &PixelSource) -> GraphicsResult<Self> {
        match source {
            PixelSource::Compressed(image) => {
                if !caps.compressed_mipmaps {
                    return Err(GraphicsError::UnsupportedOperation(
                        "mipmaps for compressed images are not supported on this device"
                            .to_string(),
                    ));
                }
                if !image.has_full_chain() && !caps.texture_max_level {
                    return Err(GraphicsError::UnsupportedOperation(
                        "compressed image does not have all required mipmap levels".to_string(),
                    ));
                }
                let max_level = caps
                    .texture_max_level
                    .then(|| image.level_count().saturating_sub(1) as u32);
                Ok(Self::CompressedLevels { max_level })
            }
            PixelSource::Raw(_) => {
                if caps.mipmap_generation == MipmapGeneration::Unsupported {
                    return Err(GraphicsError::UnsupportedOperation(
                        "mipmap generation is not supported on this device".to_string(),
                    ));
                }
                if !source.is_power_of_two() && !caps.npot_mipmaps {
                    return Err(GraphicsError::UnsupportedOperation(
                        "cannot create mipmaps: image does not have power-of-two dimensions"
                            .to_string(),
                    ));
                }
                if caps.mipmap_generation == MipmapGeneration::Native && caps.npot {
                    Ok(Self::NativeGenerate)
                } else {
                    Ok(Self::LegacyAutoGenerate)
                }
            }
        }
    }
}
