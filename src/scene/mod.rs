//! Placement of drawables.

mod transform;

pub use transform::Transform2D;
