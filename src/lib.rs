//! # RedLilium Drawables
//!
//! Device-resident drawables for a 2D renderer: meshes with arbitrary vertex
//! formats and volatile textures that survive graphics context loss.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Mesh`] - Vertex memory, vertex map, borrowed attributes and draw state
//! - [`TextureResource`] - Pixel data with a load/unload life cycle, power-of-two
//!   padding fallback and mipmap creation
//! - [`GraphicsDevice`] - Trait the resources talk to, with capability queries
//! - [`DummyDevice`] - Recording device for testing
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_drawables::*;
//!
//! let mut device = DummyDevice::new();
//! let config = GraphicsConfig::default();
//!
//! let image = ImageData::from_file("sprite.png")?;
//! let mut texture = TextureResource::from_image(image, &config.texture);
//! texture.load(&mut device)?;
//! texture.draw(&mut device, &Transform2D::from_position(Vec2::new(10.0, 20.0)));
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod mesh;
pub mod resources;
pub mod scene;

// Re-export main types for convenience
pub use backend::{
    AttributeStep, BackendError, BufferUsageHint, CompressedFormat, DeviceCapabilities,
    DummyDevice, Filter, FilterMode, GraphicsDevice, IndexFormat, MipmapFilter,
    PrimitiveTopology, Vertex2D, Wrap, WrapMode,
};
pub use config::{GraphicsConfig, MeshDefaults, TextureDefaults};
pub use error::{GraphicsError, GraphicsResult};
pub use mesh::{GeometryBuffer, Mesh, SharedBuffer, VertexFormat};
pub use resources::{
    CompressedImageData, CompressedLevel, ImageData, PixelSource, SharedTexture,
    TextureResource,
};
pub use scene::Transform2D;

pub use glam::{Mat4, Vec2};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version.
pub fn init() {
    log::info!("RedLilium Drawables v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_device() {
        let device = DummyDevice::new();
        assert_eq!(device.name(), "Dummy Device");
    }
}
