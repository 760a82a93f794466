//! Mesh: vertex memory, vertex map, attached attributes and drawing.

use std::ops::Range;
use std::sync::Arc;

use glam::Mat4;

use crate::backend::{
    AttributeStep, BufferDescriptor, BufferKind, BufferUsageHint, DrawCommand, GraphicsDevice,
    IndexFormat, PrimitiveTopology, TextureHandle,
};
use crate::config::MeshDefaults;
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::SharedTexture;

use super::attributes::{resolve_attributes, AttachedAttribute};
use super::buffer::{BufferMapping, GeometryBuffer, SharedBuffer, VertexMapping};
use super::format::VertexFormat;
use super::vertex_map;

/// Arbitrary vertex geometry.
///
/// A mesh owns one vertex buffer laid out by its [`VertexFormat`] and
/// optionally an index buffer (the "vertex map"). It can also borrow
/// attribute streams from other buffers without owning them.
///
/// # Example
///
/// ```ignore
/// let mut mesh = Mesh::new(&mut device, VertexFormat::default_2d(), 4,
///     PrimitiveTopology::TriangleFan, BufferUsageHint::Dynamic)?;
/// mesh.set_vertex(0, bytemuck::bytes_of(&vertex))?;
/// mesh.set_draw_range(1, 2);
/// mesh.draw(&mut device, Mat4::IDENTITY)?;
/// ```
#[derive(Debug)]
pub struct Mesh {
    format: Arc<VertexFormat>,
    vertex_buffer: SharedBuffer,
    vertex_count: usize,
    enabled: Vec<bool>,
    attached: Vec<AttachedAttribute>,
    scratch: Vec<u8>,

    index_buffer: Option<GeometryBuffer>,
    use_index_buffer: bool,
    index_count: usize,
    index_format: IndexFormat,

    topology: PrimitiveTopology,
    /// (start, count)
    draw_range: Option<(u32, u32)>,
    texture: Option<SharedTexture>,
}

impl Mesh {
    /// Create a mesh with `vertex_count` zero-filled vertices.
    pub fn new<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        format: Arc<VertexFormat>,
        vertex_count: usize,
        topology: PrimitiveTopology,
        usage: BufferUsageHint,
    ) -> GraphicsResult<Self> {
        if vertex_count == 0 {
            return Err(GraphicsError::InvalidParameter(
                "a mesh needs at least one vertex".to_string(),
            ));
        }
        if u32::try_from(vertex_count).is_err() {
            return Err(GraphicsError::InvalidParameter(format!(
                "{vertex_count} vertices exceed the drawable limit"
            )));
        }
        let buffer = GeometryBuffer::vertices(device, format.clone(), vertex_count, usage)?;
        let stride = format.stride();
        log::debug!(
            "Created mesh: {} vertices, stride {}, {:?}",
            vertex_count,
            stride,
            topology
        );
        Ok(Self {
            enabled: vec![true; format.attribute_count()],
            format,
            vertex_buffer: buffer.into_shared(),
            vertex_count,
            attached: Vec::new(),
            scratch: vec![0; stride],
            index_buffer: None,
            use_index_buffer: false,
            index_count: 0,
            index_format: IndexFormat::for_vertex_count(vertex_count),
            topology,
            draw_range: None,
            texture: None,
        })
    }

    /// Create a mesh using the configured topology and usage.
    pub fn with_defaults<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        format: Arc<VertexFormat>,
        vertex_count: usize,
        defaults: &MeshDefaults,
    ) -> GraphicsResult<Self> {
        Self::new(
            device,
            format,
            vertex_count,
            defaults.topology,
            defaults.usage,
        )
    }

    /// Create a mesh from interleaved vertex bytes.
    pub fn with_data<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        format: Arc<VertexFormat>,
        data: &[u8],
        topology: PrimitiveTopology,
        usage: BufferUsageHint,
    ) -> GraphicsResult<Self> {
        format.validate()?;
        let stride = format.stride();
        if data.is_empty() || data.len() % stride != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "vertex data of {} bytes is not a non-zero multiple of the stride ({})",
                data.len(),
                stride
            )));
        }
        let mesh = Self::new(device, format, data.len() / stride, topology, usage)?;
        mesh.vertex_buffer.write().write(0, data)?;
        Ok(mesh)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn vertex_stride(&self) -> usize {
        self.format.stride()
    }

    pub fn vertex_format(&self) -> &Arc<VertexFormat> {
        &self.format
    }

    /// The vertex buffer, for lending attributes to other meshes.
    pub fn vertex_buffer(&self) -> &SharedBuffer {
        &self.vertex_buffer
    }

    /// Write one vertex record. At most one stride is copied.
    pub fn set_vertex(&mut self, index: usize, data: &[u8]) -> GraphicsResult<()> {
        self.check_vertex(index)?;
        let stride = self.vertex_stride();
        let len = data.len().min(stride);
        self.vertex_buffer
            .write()
            .write(index * stride, &data[..len])
    }

    /// Read one vertex record into `out`. Returns the number of bytes copied.
    pub fn get_vertex(&self, index: usize, out: &mut [u8]) -> GraphicsResult<usize> {
        self.check_vertex(index)?;
        let stride = self.vertex_stride();
        let len = out.len().min(stride);
        self.vertex_buffer
            .read()
            .read(index * stride, &mut out[..len])?;
        Ok(len)
    }

    /// Write one attribute of one vertex. At most the attribute size is copied.
    pub fn set_vertex_attribute(
        &mut self,
        vertex_index: usize,
        attrib_index: usize,
        data: &[u8],
    ) -> GraphicsResult<()> {
        let range = self.attribute_range(vertex_index, attrib_index)?;
        let len = data.len().min(range.len());
        self.vertex_buffer.write().write(range.start, &data[..len])
    }

    /// Read one attribute of one vertex. Returns the number of bytes copied.
    pub fn get_vertex_attribute(
        &self,
        vertex_index: usize,
        attrib_index: usize,
        out: &mut [u8],
    ) -> GraphicsResult<usize> {
        let range = self.attribute_range(vertex_index, attrib_index)?;
        let len = out.len().min(range.len());
        self.vertex_buffer
            .read()
            .read(range.start, &mut out[..len])?;
        Ok(len)
    }

    /// A reusable buffer the size of one vertex record.
    pub fn vertex_scratch_buffer(&mut self) -> &mut [u8] {
        &mut self.scratch
    }

    /// Exclusive CPU access to the vertex memory.
    ///
    /// The mesh cannot be drawn or mapped again until the mapping is dropped.
    pub fn map_vertex_data(&mut self) -> VertexMapping<'_> {
        BufferMapping::new(self.vertex_buffer.write())
    }

    /// Upload pending CPU writes.
    pub fn flush<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        self.vertex_buffer.write().flush(device);
        if let Some(index_buffer) = &mut self.index_buffer {
            index_buffer.flush(device);
        }
    }

    /// Install an explicit draw order.
    ///
    /// The index width is the narrowest that addresses every vertex. An empty
    /// map is allowed and draws the vertices in storage order.
    pub fn set_vertex_map<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        map: &[u32],
    ) -> GraphicsResult<()> {
        vertex_map::validate(map, self.vertex_count)?;
        let format = IndexFormat::for_vertex_count(self.vertex_count);
        let bytes = vertex_map::encode(map, format);
        self.store_indices(device, format, &bytes, map.len())
    }

    /// Install pre-encoded indices. Values are not validated.
    pub fn set_vertex_map_raw<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        format: IndexFormat,
        data: &[u8],
    ) -> GraphicsResult<()> {
        let count = data.len() / format.size();
        self.store_indices(device, format, &data[..count * format.size()], count)
    }

    /// Draw vertices in storage order again. The index buffer is kept for reuse.
    pub fn clear_vertex_map(&mut self) {
        self.use_index_buffer = false;
    }

    /// The installed vertex map, or `None` if vertices draw in storage order.
    pub fn vertex_map(&self) -> Option<Vec<u32>> {
        if !self.use_index_buffer {
            return None;
        }
        let len = self.index_count * self.index_format.size();
        match &self.index_buffer {
            Some(buffer) => Some(vertex_map::decode(
                &buffer.data()[..len],
                self.index_format,
            )),
            None => Some(Vec::new()),
        }
    }

    pub fn index_count(&self) -> usize {
        if self.use_index_buffer {
            self.index_count
        } else {
            0
        }
    }

    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    /// Borrow attribute `source_name` of `source` under `name`.
    ///
    /// Returns `false` without changing anything when `source` has no such
    /// attribute or is currently mapped. Attaching a name twice replaces the earlier attachment.
    pub fn attach_attribute(
        &mut self,
        name: &str,
        source: &SharedBuffer,
        source_name: &str,
        step: AttributeStep,
    ) -> bool {
        let index = {
            let Some(source) = source.try_read() else {
                log::warn!("cannot attach '{}': source buffer is mapped", name);
                return false;
            };
            match source.format().and_then(|f| f.attribute_index(source_name)) {
                Some(index) => index,
                None => return false,
            }
        };

        let attachment = AttachedAttribute::new(name, source, index, step);
        match self.attached.iter_mut().find(|a| a.name == name) {
            Some(existing) => *existing = attachment,
            None => self.attached.push(attachment),
        }
        true
    }

    /// Remove an attachment. Returns whether one was removed.
    pub fn detach_attribute(&mut self, name: &str) -> bool {
        let before = self.attached.len();
        self.attached.retain(|a| a.name != name);
        self.attached.len() != before
    }

    pub fn attached_attributes(&self) -> &[AttachedAttribute] {
        &self.attached
    }

    /// Enable or disable a primary or attached attribute for drawing.
    pub fn set_attribute_enabled(&mut self, name: &str, enabled: bool) -> GraphicsResult<()> {
        if let Some(index) = self.format.attribute_index(name) {
            self.enabled[index] = enabled;
            return Ok(());
        }
        match self.attached.iter_mut().find(|a| a.name == name) {
            Some(attached) => {
                attached.enabled = enabled;
                Ok(())
            }
            None => Err(GraphicsError::UnknownAttribute(name.to_string())),
        }
    }

    pub fn is_attribute_enabled(&self, name: &str) -> GraphicsResult<bool> {
        if let Some(index) = self.format.attribute_index(name) {
            return Ok(self.enabled[index]);
        }
        self.attached
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.enabled)
            .ok_or_else(|| GraphicsError::UnknownAttribute(name.to_string()))
    }

    /// Restrict drawing to `count` elements starting at `start`.
    /// A count of zero removes the restriction.
    pub fn set_draw_range(&mut self, start: u32, count: u32) {
        self.draw_range = (count > 0).then_some((start, count));
    }

    pub fn reset_draw_range(&mut self) {
        self.draw_range = None;
    }

    /// Current draw range as (start, count).
    pub fn draw_range(&self) -> Option<(u32, u32)> {
        self.draw_range
    }

    pub fn set_texture(&mut self, texture: Option<SharedTexture>) {
        self.texture = texture;
    }

    pub fn texture(&self) -> Option<&SharedTexture> {
        self.texture.as_ref()
    }

    pub fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.topology = topology;
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// The draw this mesh would issue, or `None` if the range is empty.
    pub fn draw_command(&self, instances: u32) -> Option<DrawCommand> {
        let indexed = self.use_index_buffer && self.index_buffer.is_some() && self.index_count > 0;
        let count = if indexed {
            self.index_count
        } else {
            self.vertex_count
        };
        // Both counts are checked against u32 when they are set.
        let total = u32::try_from(count).unwrap_or(u32::MAX);

        let mut range: Range<u32> = 0..total;
        if let Some((start, count)) = self.draw_range {
            range = start.min(total)..start.saturating_add(count).min(total);
        }
        if range.is_empty() || instances == 0 {
            return None;
        }

        Some(DrawCommand {
            topology: self.topology,
            range,
            instances,
            index_format: indexed.then_some(self.index_format),
        })
    }

    /// Draw the mesh once with the given transform.
    pub fn draw<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        transform: impl Into<Mat4>,
    ) -> GraphicsResult<()> {
        self.draw_instanced(device, transform, 1)
    }

    /// Draw `instances` copies of the mesh.
    pub fn draw_instanced<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        transform: impl Into<Mat4>,
        instances: u32,
    ) -> GraphicsResult<()> {
        if instances == 0 {
            return Ok(());
        }

        let primary = self.vertex_buffer.read().handle();
        let bindings = resolve_attributes(&self.format, &self.enabled, primary, &self.attached);
        let per_instance = bindings
            .iter()
            .any(|b| b.step == AttributeStep::PerInstance);
        if (instances > 1 || per_instance) && !device.capabilities().instancing {
            return Err(GraphicsError::UnsupportedOperation(
                "instanced drawing is not supported on this device".to_string(),
            ));
        }

        self.vertex_buffer.write().flush(device);
        for attached in self.attached.iter().filter(|a| a.enabled) {
            let Some(source) = attached.source() else {
                continue;
            };
            if let Some(mut source) = source.try_write() {
                source.flush(device);
            };
        }

        let Some(command) = self.draw_command(instances) else {
            return Ok(());
        };

        device.set_transform(transform.into());
        for binding in &bindings {
            device.bind_vertex_attribute(binding);
        }
        device.bind_texture(self.texture_handle());
        if let (Some(format), Some(index_buffer)) = (command.index_format, &self.index_buffer) {
            device.set_index_buffer(index_buffer.handle(), format);
        }
        device.draw(&command);
        Ok(())
    }

    /// Release the owned device buffers.
    ///
    /// The vertex buffer is only released if no one else holds it.
    pub fn destroy<D: GraphicsDevice + ?Sized>(self, device: &mut D) {
        if let Some(index_buffer) = self.index_buffer {
            index_buffer.destroy(device);
        }
        match Arc::try_unwrap(self.vertex_buffer) {
            Ok(buffer) => buffer.into_inner().destroy(device),
            Err(_) => log::warn!("Mesh destroyed while its vertex buffer is still shared"),
        }
    }

    fn texture_handle(&self) -> Option<TextureHandle> {
        self.texture.as_ref().and_then(|texture| texture.read().handle())
    }

    fn check_vertex(&self, index: usize) -> GraphicsResult<()> {
        if index >= self.vertex_count {
            return Err(GraphicsError::out_of_range("vertex", index, self.vertex_count));
        }
        Ok(())
    }

    fn attribute_range(&self, vertex_index: usize, attrib_index: usize) -> GraphicsResult<Range<usize>> {
        self.check_vertex(vertex_index)?;
        let attr = self.format.attribute(attrib_index).ok_or_else(|| {
            GraphicsError::out_of_range("attribute", attrib_index, self.format.attribute_count())
        })?;
        let start = vertex_index * self.vertex_stride() + attr.offset;
        Ok(start..start + attr.size())
    }

    fn store_indices<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        format: IndexFormat,
        bytes: &[u8],
        count: usize,
    ) -> GraphicsResult<()> {
        if u32::try_from(count).is_err() {
            return Err(GraphicsError::InvalidParameter(format!(
                "vertex map of {count} entries exceeds the drawable limit"
            )));
        }
        let fits = self
            .index_buffer
            .as_ref()
            .is_some_and(|buffer| buffer.size() >= bytes.len());
        if !fits && !bytes.is_empty() {
            let desc = BufferDescriptor {
                label: Some("vertex map".to_string()),
                size: bytes.len() as u64,
                kind: BufferKind::Index,
                usage: BufferUsageHint::Dynamic,
            };
            let buffer = GeometryBuffer::new(device, &desc, None)?;
            if let Some(old) = self.index_buffer.replace(buffer) {
                old.destroy(device);
            }
        }

        if let Some(buffer) = &mut self.index_buffer {
            buffer.write(0, bytes)?;
            buffer.flush(device);
        }
        self.use_index_buffer = true;
        self.index_count = count;
        self.index_format = format;
        Ok(())
    }
}
