//! Common utilities for drawable integration tests.
//!
//! Tests run against the recording [`DummyDevice`] configured with different
//! capability profiles, so both native and fallback paths are exercised.

use std::sync::Arc;

use redlilium_drawables::backend::{ComponentType, DeviceCommand, DrawCommand};
use redlilium_drawables::mesh::vertex_map;
use redlilium_drawables::{
    BufferUsageHint, CompressedFormat, CompressedImageData, CompressedLevel, DeviceCapabilities,
    DummyDevice, ImageData, Mesh, PrimitiveTopology, Vertex2D, VertexFormat,
};

// ============================================================================
// Device Profiles
// ============================================================================

/// Capability profiles the tests run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Everything supported.
    Modern,
    /// Power-of-two only, no compression, legacy mipmap generation.
    Legacy,
    /// Modern, but without non-power-of-two textures.
    PotOnly,
}

impl Profile {
    pub fn capabilities(self) -> DeviceCapabilities {
        match self {
            Profile::Modern => DeviceCapabilities::modern(),
            Profile::Legacy => DeviceCapabilities::legacy(),
            Profile::PotOnly => DeviceCapabilities {
                npot: false,
                npot_mipmaps: false,
                ..DeviceCapabilities::modern()
            },
        }
    }

    pub fn device(self) -> DummyDevice {
        init_logging();
        DummyDevice::with_capabilities(self.capabilities())
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Mesh Helpers
// ============================================================================

/// Unit quad in fan order.
#[allow(dead_code)]
pub const QUAD_VERTICES: [Vertex2D; 4] = [
    Vertex2D::new(0.0, 0.0, 0.0, 0.0),
    Vertex2D::new(1.0, 0.0, 1.0, 0.0),
    Vertex2D::new(1.0, 1.0, 1.0, 1.0),
    Vertex2D::new(0.0, 1.0, 0.0, 1.0),
];

/// Position and texture coordinate, matching [`Vertex2D`].
#[allow(dead_code)]
pub fn position_texcoord_format() -> Arc<VertexFormat> {
    Arc::new(
        VertexFormat::new()
            .with_attribute("VertexPosition", ComponentType::Float, 2)
            .with_attribute("VertexTexCoord", ComponentType::Float, 2),
    )
}

/// A four-vertex triangle fan.
#[allow(dead_code)]
pub fn create_quad_mesh(device: &mut DummyDevice) -> Mesh {
    Mesh::with_data(
        device,
        position_texcoord_format(),
        bytemuck::cast_slice(&QUAD_VERTICES),
        PrimitiveTopology::TriangleFan,
        BufferUsageHint::Dynamic,
    )
    .expect("Failed to create quad mesh")
}

/// A buffer of per-instance 2D offsets that meshes can borrow.
#[allow(dead_code)]
pub fn create_offset_mesh(device: &mut DummyDevice, count: usize) -> Mesh {
    let format = Arc::new(VertexFormat::new().with_attribute(
        "InstanceOffset",
        ComponentType::Float,
        2,
    ));
    Mesh::new(
        device,
        format,
        count,
        PrimitiveTopology::PointList,
        BufferUsageHint::Static,
    )
    .expect("Failed to create offset mesh")
}

/// Vertex indices a recorded draw visits, in order.
///
/// Indexed draws are resolved through the device-side contents of the most
/// recently bound index buffer.
#[allow(dead_code)]
pub fn visited_vertices(device: &DummyDevice, draw: &DrawCommand) -> Vec<u32> {
    let Some(format) = draw.index_format else {
        return draw.range.clone().collect();
    };
    let buffer = device
        .commands()
        .iter()
        .rev()
        .find_map(|cmd| match cmd {
            DeviceCommand::SetIndexBuffer { buffer, .. } => Some(*buffer),
            _ => None,
        })
        .expect("indexed draw without an index buffer");
    let bytes = device
        .buffer_contents(buffer)
        .expect("index buffer was destroyed");
    let indices = vertex_map::decode(bytes, format);
    draw.range.clone().map(|i| indices[i as usize]).collect()
}

// ============================================================================
// Texture Helpers
// ============================================================================

/// Generate a test pattern with sequential bytes.
#[allow(dead_code)]
pub fn generate_test_pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

#[allow(dead_code)]
pub fn create_image(width: u32, height: u32) -> ImageData {
    let pixels = generate_test_pattern(width as usize * height as usize * 4);
    ImageData::new(width, height, pixels).expect("Failed to create image")
}

/// A DXT1 image with levels from `width`x`height` down `levels` steps.
#[allow(dead_code)]
pub fn create_dxt1_image(width: u32, height: u32, levels: usize) -> CompressedImageData {
    let levels = (0..levels)
        .map(|i| {
            let w = (width >> i).max(1);
            let h = (height >> i).max(1);
            let blocks = w.div_ceil(4) as usize * h.div_ceil(4) as usize;
            CompressedLevel {
                width: w,
                height: h,
                data: vec![0; blocks * 8],
            }
        })
        .collect();
    CompressedImageData::new(CompressedFormat::Dxt1, levels)
        .expect("Failed to create compressed image")
}
