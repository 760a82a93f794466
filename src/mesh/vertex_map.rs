//! Vertex map (index buffer) encoding.
//!
//! Indices are stored in native byte order at the narrowest width that can
//! address every vertex of the mesh.

use crate::backend::IndexFormat;
use crate::error::{GraphicsError, GraphicsResult};

/// Check that every index addresses an existing vertex.
pub fn validate(indices: &[u32], vertex_count: usize) -> GraphicsResult<()> {
    match indices.iter().find(|&&index| index as usize >= vertex_count) {
        Some(&index) => Err(GraphicsError::out_of_range(
            "vertex map value",
            index as usize,
            vertex_count,
        )),
        None => Ok(()),
    }
}

/// Encode indices at the given width. Values are truncated for `Uint16`.
pub fn encode(indices: &[u32], format: IndexFormat) -> Vec<u8> {
    match format {
        IndexFormat::Uint16 => {
            let narrow: Vec<u16> = indices.iter().map(|&index| index as u16).collect();
            bytemuck::cast_slice(&narrow).to_vec()
        }
        IndexFormat::Uint32 => bytemuck::cast_slice(indices).to_vec(),
    }
}

/// Decode every whole index in `bytes`.
pub fn decode(bytes: &[u8], format: IndexFormat) -> Vec<u32> {
    match format {
        IndexFormat::Uint16 => bytes
            .chunks_exact(2)
            .map(|chunk| bytemuck::pod_read_unaligned::<u16>(chunk) as u32)
            .collect(),
        IndexFormat::Uint32 => bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<u32>)
            .collect(),
    }
}
