//! Error types for drawable resources.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors surfaced by meshes and textures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphicsError {
    /// A vertex, attribute or index value is outside its valid range.
    #[error("{what} index {index} is out of range (count: {count})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },
    /// The device cannot handle the pixel format of a resource.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// The device cannot perform the requested operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// The device rejected an allocation.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    /// Malformed construction parameters.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// No primary or attached vertex attribute carries this name.
    #[error("mesh has no vertex attribute named '{0}'")]
    UnknownAttribute(String),
    /// Any other device error.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type GraphicsResult<T> = Result<T, GraphicsError>;

impl GraphicsError {
    pub(crate) fn out_of_range(what: &'static str, index: usize, count: usize) -> Self {
        Self::OutOfRange { what, index, count }
    }

    /// Map a device error raised while allocating storage.
    pub(crate) fn from_allocation(err: BackendError) -> Self {
        match err {
            BackendError::OutOfMemory
            | BackendError::BufferCreationFailed(_)
            | BackendError::TextureCreationFailed(_) => Self::ResourceExhausted(err.to_string()),
            other => Self::Backend(other),
        }
    }
}
