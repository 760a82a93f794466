//! Common types shared between devices and drawables

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use super::traits::BufferHandle;

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

/// Index format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub fn size(&self) -> usize {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }

    /// Smallest index width able to address every vertex of a buffer
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count.saturating_sub(1) > u16::MAX as usize {
            IndexFormat::Uint32
        } else {
            IndexFormat::Uint16
        }
    }
}

/// Scalar type of a vertex attribute component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Float,
    Int,
    Uint,
    /// 8-bit unsigned, normalized to 0.0-1.0
    Unorm8,
    /// 8-bit signed, normalized to -1.0-1.0
    Snorm8,
    /// 16-bit unsigned, normalized to 0.0-1.0
    Unorm16,
}

impl ComponentType {
    pub fn size(&self) -> usize {
        match self {
            ComponentType::Float | ComponentType::Int | ComponentType::Uint => 4,
            ComponentType::Unorm16 => 2,
            ComponentType::Unorm8 | ComponentType::Snorm8 => 1,
        }
    }
}

/// How an attribute stream advances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttributeStep {
    #[default]
    PerVertex,
    PerInstance,
}

/// Expected update frequency of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsageHint {
    Static,
    #[default]
    Dynamic,
    Stream,
}

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub kind: BufferKind,
    pub usage: BufferUsageHint,
}

/// Filter mode for minification and magnification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Filter mode between mipmap levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MipmapFilter {
    #[default]
    None,
    Nearest,
    Linear,
}

impl MipmapFilter {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, MipmapFilter::None)
    }
}

/// Texture filter state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filter {
    pub min: FilterMode,
    pub mag: FilterMode,
    pub mipmap: MipmapFilter,
    pub anisotropy: f32,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            min: FilterMode::Linear,
            mag: FilterMode::Linear,
            mipmap: MipmapFilter::None,
            anisotropy: 1.0,
        }
    }
}

/// Address mode for samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Clamp,
    Repeat,
    MirroredRepeat,
}

/// Texture wrap state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Wrap {
    pub horizontal: WrapMode,
    pub vertical: WrapMode,
}

/// Block-compressed texture formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressedFormat {
    Dxt1,
    Dxt3,
    Dxt5,
    Bc5Signed,
    Bc5Unsigned,
    Bc7,
    Bc7Srgb,
}

impl CompressedFormat {
    pub fn name(&self) -> &'static str {
        match self {
            CompressedFormat::Dxt1 => "DXT1",
            CompressedFormat::Dxt3 => "DXT3",
            CompressedFormat::Dxt5 => "DXT5",
            CompressedFormat::Bc5Signed => "BC5s",
            CompressedFormat::Bc5Unsigned => "BC5",
            CompressedFormat::Bc7 => "BC7",
            CompressedFormat::Bc7Srgb => "BC7 sRGB",
        }
    }
}

/// Vertex of a textured 2D quad
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex2D {
    pub x: f32,
    pub y: f32,
    pub s: f32,
    pub t: f32,
}

impl Vertex2D {
    pub const fn new(x: f32, y: f32, s: f32, t: f32) -> Self {
        Self { x, y, s, t }
    }
}

/// One resolved attribute slot for a draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeBinding {
    pub slot: u32,
    pub name: String,
    pub buffer: BufferHandle,
    pub offset: u64,
    pub stride: u64,
    pub component_type: ComponentType,
    pub component_count: u8,
    pub step: AttributeStep,
}

/// A draw over the currently bound attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCommand {
    pub topology: PrimitiveTopology,
    /// Vertices, or indices when `index_format` is set
    pub range: Range<u32>,
    pub instances: u32,
    pub index_format: Option<IndexFormat>,
}

impl DrawCommand {
    pub fn is_indexed(&self) -> bool {
        self.index_format.is_some()
    }
}
