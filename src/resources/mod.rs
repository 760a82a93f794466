//! Texture resources
//!
//! Handles pixel data, sampler state and the load/unload life cycle of
//! device textures.

mod pixels;
pub mod sampler;
mod texture;
mod upload;

pub use pixels::*;
pub use texture::*;
pub use upload::*;
