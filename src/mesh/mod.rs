//! Mesh types.
//!
//! - [`VertexFormat`] - Describes the attributes of one vertex record (shared via `Arc`)
//! - [`GeometryBuffer`] - Device buffer with a CPU shadow copy and dirty tracking
//! - [`Mesh`] - Vertex buffer, vertex map, attached attributes and draw state
//!
//! # Borrowing attributes
//!
//! A mesh's vertex buffer is a [`SharedBuffer`]. Other meshes can attach its
//! attributes (for example a per-instance offset stream) without keeping it
//! alive; attachments whose lender is gone are skipped at draw time.

mod attributes;
mod buffer;
mod data;
mod format;
pub mod vertex_map;

pub use attributes::{resolve_attributes, AttachedAttribute};
pub use buffer::{BufferMapping, GeometryBuffer, SharedBuffer, VertexMapping};
pub use data::Mesh;
pub use format::{VertexAttribute, VertexFormat};
