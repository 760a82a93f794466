//! Device capability and command interface
//!
//! Drawables never talk to a graphics API directly. Everything they need from
//! the device goes through [`GraphicsDevice`]: a capability snapshot plus
//! imperative upload, bind and draw commands addressed by opaque handles.

use bitflags::bitflags;
use glam::Mat4;
use thiserror::Error;

use crate::backend::types::*;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u64);

bitflags! {
    /// Block-compression families a device can sample from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CompressionSupport: u32 {
        /// DXT1, DXT3, DXT5.
        const S3TC = 1 << 0;
        /// BC5 signed and unsigned.
        const RGTC = 1 << 1;
        /// BC7 and BC7 sRGB.
        const BPTC = 1 << 2;
    }
}

impl CompressionSupport {
    /// Family flag a compressed format belongs to.
    pub fn family_of(format: CompressedFormat) -> Self {
        match format {
            CompressedFormat::Dxt1 | CompressedFormat::Dxt3 | CompressedFormat::Dxt5 => Self::S3TC,
            CompressedFormat::Bc5Signed | CompressedFormat::Bc5Unsigned => Self::RGTC,
            CompressedFormat::Bc7 | CompressedFormat::Bc7Srgb => Self::BPTC,
        }
    }
}

/// How a device can build mipmap chains for uncompressed textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MipmapGeneration {
    /// No automatic generation
    #[default]
    Unsupported,
    /// Generation requested as a texture parameter before the base upload
    Legacy,
    /// Explicit generate command after the base upload
    Native,
}

/// Snapshot of what the device can do
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCapabilities {
    /// Non-power-of-two texture dimensions
    pub npot: bool,
    pub compression: CompressionSupport,
    pub mipmap_generation: MipmapGeneration,
    /// Mipmap generation works on non-power-of-two textures
    pub npot_mipmaps: bool,
    /// Explicit upload of compressed mip levels
    pub compressed_mipmaps: bool,
    /// The highest sampled mip level can be limited
    pub texture_max_level: bool,
    pub lod_bias: bool,
    pub max_lod_bias: f32,
    pub max_anisotropy: f32,
    pub max_texture_size: u32,
    pub instancing: bool,
}

impl DeviceCapabilities {
    /// A current desktop-class device.
    pub fn modern() -> Self {
        Self {
            npot: true,
            compression: CompressionSupport::all(),
            mipmap_generation: MipmapGeneration::Native,
            npot_mipmaps: true,
            compressed_mipmaps: true,
            texture_max_level: true,
            lod_bias: true,
            max_lod_bias: 16.0,
            max_anisotropy: 16.0,
            max_texture_size: 16384,
            instancing: true,
        }
    }

    /// An old fixed-function device: power-of-two textures only, no compression.
    pub fn legacy() -> Self {
        Self {
            npot: false,
            compression: CompressionSupport::empty(),
            mipmap_generation: MipmapGeneration::Legacy,
            npot_mipmaps: false,
            compressed_mipmaps: false,
            texture_max_level: false,
            lod_bias: false,
            max_lod_bias: 0.0,
            max_anisotropy: 1.0,
            max_texture_size: 2048,
            instancing: false,
        }
    }

    pub fn supports_compressed(&self, format: CompressedFormat) -> bool {
        self.compression
            .contains(CompressionSupport::family_of(format))
    }
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self::modern()
    }
}

/// Graphics device used by meshes and textures.
///
/// Upload commands do not return errors. Failures accumulate on the device and
/// are collected with [`GraphicsDevice::check_errors`] once per logical
/// operation.
pub trait GraphicsDevice {
    /// Get the device name
    fn name(&self) -> &'static str;

    /// Capability snapshot
    fn capabilities(&self) -> DeviceCapabilities;

    /// Take the first error reported since the last call, if any
    fn check_errors(&mut self) -> Option<BackendError>;

    // Buffers

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    // Textures

    fn create_texture(&mut self) -> BackendResult<TextureHandle>;

    /// Bind a texture for subsequent sampling, or unbind with `None`
    fn bind_texture(&mut self, texture: Option<TextureHandle>);

    /// Allocate RGBA8 storage for a level, optionally filling it
    fn allocate_texture_level(
        &mut self,
        texture: TextureHandle,
        level: u32,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    );

    /// Write RGBA8 pixels into a sub-rectangle of a level
    #[allow(clippy::too_many_arguments)]
    fn write_texture_region(
        &mut self,
        texture: TextureHandle,
        level: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    );

    fn upload_compressed_level(
        &mut self,
        texture: TextureHandle,
        level: u32,
        format: CompressedFormat,
        width: u32,
        height: u32,
        data: &[u8],
    );

    fn generate_mipmaps(&mut self, texture: TextureHandle);

    /// Legacy automatic mipmap generation on base level uploads
    fn set_auto_mipmap_generation(&mut self, texture: TextureHandle, enabled: bool);

    fn set_max_mip_level(&mut self, texture: TextureHandle, level: u32);

    /// Apply a filter, returning the anisotropy actually in effect
    fn set_texture_filter(&mut self, texture: TextureHandle, filter: &Filter) -> f32;

    fn set_texture_wrap(&mut self, texture: TextureHandle, wrap: &Wrap);

    fn set_lod_bias(&mut self, texture: TextureHandle, bias: f32);

    fn destroy_texture(&mut self, texture: TextureHandle);

    // Drawing

    fn set_transform(&mut self, transform: Mat4);

    fn bind_vertex_attribute(&mut self, binding: &AttributeBinding);

    fn set_index_buffer(&mut self, buffer: BufferHandle, format: IndexFormat);

    fn draw(&mut self, command: &DrawCommand);

    /// Draw client-side vertices without a vertex buffer
    fn draw_vertices(&mut self, topology: PrimitiveTopology, vertices: &[Vertex2D]);
}
