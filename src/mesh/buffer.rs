//! CPU-shadowed geometry buffers.
//!
//! A [`GeometryBuffer`] keeps a CPU copy of its contents next to the device
//! buffer. Writes go to the CPU copy and widen a single dirty range; [`flush`]
//! uploads that range and clears it.
//!
//! Buffers that other meshes may borrow attributes from are shared as
//! [`SharedBuffer`]. Borrowers only ever hold a `Weak` reference.
//!
//! [`flush`]: GeometryBuffer::flush

use std::ops::{Deref, DerefMut, Range};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::backend::{
    BufferDescriptor, BufferHandle, BufferKind, BufferUsageHint, GraphicsDevice,
};
use crate::error::{GraphicsError, GraphicsResult};

use super::format::VertexFormat;

/// A geometry buffer that can lend attribute streams to other meshes.
pub type SharedBuffer = Arc<RwLock<GeometryBuffer>>;

/// Scoped write access to a mesh's vertex memory.
pub type VertexMapping<'a> = BufferMapping<RwLockWriteGuard<'a, GeometryBuffer>>;

/// A linear device buffer with a CPU shadow copy.
#[derive(Debug)]
pub struct GeometryBuffer {
    handle: BufferHandle,
    kind: BufferKind,
    usage: BufferUsageHint,
    format: Option<Arc<VertexFormat>>,
    data: Vec<u8>,
    dirty: Option<Range<usize>>,
    label: Option<String>,
}

impl GeometryBuffer {
    /// Create a zero-filled buffer on the device.
    pub fn new<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        desc: &BufferDescriptor,
        format: Option<Arc<VertexFormat>>,
    ) -> GraphicsResult<Self> {
        let handle = device
            .create_buffer(desc)
            .map_err(GraphicsError::from_allocation)?;
        Ok(Self {
            handle,
            kind: desc.kind,
            usage: desc.usage,
            format,
            data: vec![0; desc.size as usize],
            dirty: None,
            label: desc.label.clone(),
        })
    }

    /// Create a vertex buffer holding `vertex_count` records of `format`.
    pub fn vertices<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        format: Arc<VertexFormat>,
        vertex_count: usize,
        usage: BufferUsageHint,
    ) -> GraphicsResult<Self> {
        format.validate()?;
        let size = format.stride().checked_mul(vertex_count).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!(
                "{} vertices of stride {} do not fit in memory",
                vertex_count,
                format.stride()
            ))
        })?;
        let desc = BufferDescriptor {
            label: None,
            size: size as u64,
            kind: BufferKind::Vertex,
            usage,
        };
        Self::new(device, &desc, Some(format))
    }

    pub fn into_shared(self) -> SharedBuffer {
        Arc::new(RwLock::new(self))
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn usage(&self) -> BufferUsageHint {
        self.usage
    }

    /// Declared vertex layout, if this is a vertex buffer.
    pub fn format(&self) -> Option<&Arc<VertexFormat>> {
        self.format.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Number of whole vertex records, if this is a vertex buffer.
    pub fn vertex_count(&self) -> Option<usize> {
        self.format
            .as_ref()
            .map(|format| self.data.len() / format.stride().max(1))
    }

    /// CPU copy of the contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Write bytes at `offset` and mark them modified.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) -> GraphicsResult<()> {
        let end = self.checked_end(offset, bytes.len())?;
        self.data[offset..end].copy_from_slice(bytes);
        self.mark_modified(offset, bytes.len());
        Ok(())
    }

    /// Read `out.len()` bytes starting at `offset`.
    pub fn read(&self, offset: usize, out: &mut [u8]) -> GraphicsResult<()> {
        let end = self.checked_end(offset, out.len())?;
        out.copy_from_slice(&self.data[offset..end]);
        Ok(())
    }

    /// Scoped CPU access to the whole buffer.
    pub fn map(&mut self) -> BufferMapping<&mut GeometryBuffer> {
        BufferMapping::new(self)
    }

    /// Widen the dirty range; the range is clamped to the buffer.
    pub fn mark_modified(&mut self, offset: usize, size: usize) {
        let start = offset.min(self.data.len());
        let end = offset.saturating_add(size).min(self.data.len());
        if start >= end {
            return;
        }
        self.dirty = Some(match self.dirty.take() {
            Some(range) => range.start.min(start)..range.end.max(end),
            None => start..end,
        });
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    pub fn dirty_range(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    /// Upload the dirty range. Returns whether anything was written.
    pub fn flush<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) -> bool {
        let Some(range) = self.dirty.take() else {
            return false;
        };
        device.write_buffer(self.handle, range.start as u64, &self.data[range]);
        true
    }

    /// Release the device buffer.
    pub fn destroy<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        device.destroy_buffer(self.handle);
    }

    fn checked_end(&self, offset: usize, len: usize) -> GraphicsResult<usize> {
        let end = offset.saturating_add(len);
        if end > self.data.len() {
            return Err(GraphicsError::out_of_range("buffer byte", end, self.data.len()));
        }
        Ok(end)
    }
}

/// Exclusive CPU access to a buffer's memory.
///
/// Dropping the mapping marks the whole buffer modified. Use
/// [`BufferMapping::unmap`] to report a narrower range.
pub struct BufferMapping<G: DerefMut<Target = GeometryBuffer>> {
    buffer: G,
    modified: Option<(usize, usize)>,
}

impl<G: DerefMut<Target = GeometryBuffer>> BufferMapping<G> {
    pub(crate) fn new(buffer: G) -> Self {
        Self {
            buffer,
            modified: None,
        }
    }

    /// Release the mapping, marking only `size` bytes at `offset` modified.
    pub fn unmap(mut self, offset: usize, size: usize) {
        self.modified = Some((offset, size));
    }
}

impl<G: DerefMut<Target = GeometryBuffer>> Deref for BufferMapping<G> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer.data
    }
}

impl<G: DerefMut<Target = GeometryBuffer>> DerefMut for BufferMapping<G> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.data
    }
}

impl<G: DerefMut<Target = GeometryBuffer>> Drop for BufferMapping<G> {
    fn drop(&mut self) {
        let (offset, size) = self.modified.unwrap_or((0, usize::MAX));
        self.buffer.mark_modified(offset, size);
    }
}
