//! Construction-time defaults for drawables.

use crate::backend::{BufferUsageHint, Filter, PrimitiveTopology, Wrap};

/// Configuration for the drawable resources created by an application.
#[derive(Debug, Clone, Default)]
pub struct GraphicsConfig {
    /// Defaults applied to newly created textures
    pub texture: TextureDefaults,
    /// Defaults applied to newly created meshes
    pub mesh: MeshDefaults,
}

/// Sampler state a new [`TextureResource`](crate::resources::TextureResource) starts with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDefaults {
    /// Minification, magnification and mipmap filtering
    pub filter: Filter,
    pub wrap: Wrap,
    /// Negated LOD bias; positive values select sharper mip levels
    pub mipmap_sharpness: f32,
}

impl Default for TextureDefaults {
    fn default() -> Self {
        Self {
            filter: Filter::default(),
            wrap: Wrap::default(),
            mipmap_sharpness: 0.0,
        }
    }
}

/// Settings a new [`Mesh`](crate::mesh::Mesh) starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshDefaults {
    pub topology: PrimitiveTopology,
    /// Usage hint for the vertex buffer
    pub usage: BufferUsageHint,
}

impl Default for MeshDefaults {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::TriangleFan,
            usage: BufferUsageHint::Dynamic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FilterMode, MipmapFilter, WrapMode};

    #[test]
    fn test_texture_defaults() {
        let defaults = TextureDefaults::default();
        assert_eq!(defaults.filter.min, FilterMode::Linear);
        assert_eq!(defaults.filter.mipmap, MipmapFilter::None);
        assert_eq!(defaults.wrap.horizontal, WrapMode::Clamp);
        assert_eq!(defaults.mipmap_sharpness, 0.0);
    }

    #[test]
    fn test_mesh_defaults() {
        let config = GraphicsConfig::default();
        assert_eq!(config.mesh.topology, PrimitiveTopology::TriangleFan);
        assert_eq!(config.mesh.usage, BufferUsageHint::Dynamic);
    }
}
