//! Dummy graphics device for testing and development.
//!
//! This device doesn't touch any GPU. It keeps CPU copies of buffer contents
//! and texture level sizes, records every command it receives, and reports
//! errors the way a real driver would: deferred until [`check_errors`].
//!
//! Capabilities are configurable so that both the native and the fallback
//! upload paths can be exercised on any machine.
//!
//! [`check_errors`]: GraphicsDevice::check_errors

use std::collections::{BTreeMap, HashMap};

use glam::Mat4;

use super::traits::*;
use super::types::*;

/// A command received by the [`DummyDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateBuffer { buffer: BufferHandle, size: u64 },
    WriteBuffer { buffer: BufferHandle, offset: u64, len: usize },
    DestroyBuffer(BufferHandle),
    CreateTexture(TextureHandle),
    BindTexture(Option<TextureHandle>),
    AllocateTextureLevel {
        texture: TextureHandle,
        level: u32,
        width: u32,
        height: u32,
        with_data: bool,
    },
    WriteTextureRegion {
        texture: TextureHandle,
        level: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    UploadCompressedLevel {
        texture: TextureHandle,
        level: u32,
        format: CompressedFormat,
        width: u32,
        height: u32,
    },
    GenerateMipmaps(TextureHandle),
    SetAutoMipmapGeneration { texture: TextureHandle, enabled: bool },
    SetMaxMipLevel { texture: TextureHandle, level: u32 },
    SetTextureFilter { texture: TextureHandle, filter: Filter },
    SetTextureWrap { texture: TextureHandle, wrap: Wrap },
    SetLodBias { texture: TextureHandle, bias: f32 },
    DestroyTexture(TextureHandle),
    SetTransform(Mat4),
    BindVertexAttribute(AttributeBinding),
    SetIndexBuffer { buffer: BufferHandle, format: IndexFormat },
    Draw(DrawCommand),
    DrawVertices {
        topology: PrimitiveTopology,
        vertices: Vec<Vertex2D>,
    },
}

/// Texture state tracked by the dummy device.
#[derive(Debug, Clone, Default)]
pub struct DummyTexture {
    /// Allocated size of each level
    pub levels: BTreeMap<u32, (u32, u32)>,
    pub filter: Option<Filter>,
    pub wrap: Option<Wrap>,
    pub lod_bias: f32,
    pub auto_mipmaps: bool,
    pub max_level: Option<u32>,
}

/// Dummy graphics device.
#[derive(Debug)]
pub struct DummyDevice {
    capabilities: DeviceCapabilities,
    buffers: HashMap<u64, Vec<u8>>,
    textures: HashMap<u64, DummyTexture>,
    next_buffer_id: u64,
    next_texture_id: u64,
    pending_error: Option<BackendError>,
    fail_texture_creation: bool,
    commands: Vec<DeviceCommand>,
}

impl DummyDevice {
    /// Create a dummy device with modern capabilities.
    pub fn new() -> Self {
        Self::with_capabilities(DeviceCapabilities::modern())
    }

    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            next_buffer_id: 1,
            next_texture_id: 1,
            pending_error: None,
            fail_texture_creation: false,
            commands: Vec::new(),
        }
    }

    pub fn set_capabilities(&mut self, capabilities: DeviceCapabilities) {
        self.capabilities = capabilities;
    }

    /// Make every following `create_texture` call fail with out-of-memory.
    pub fn set_fail_texture_creation(&mut self, fail: bool) {
        self.fail_texture_creation = fail;
    }

    /// Queue an error as if the driver had reported it.
    pub fn inject_error(&mut self, error: BackendError) {
        self.report(error);
    }

    /// All commands received so far.
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of recorded commands matching a predicate.
    pub fn count(&self, predicate: impl Fn(&DeviceCommand) -> bool) -> usize {
        self.commands.iter().filter(|cmd| predicate(cmd)).count()
    }

    /// Draw commands issued so far.
    pub fn draws(&self) -> Vec<&DrawCommand> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                DeviceCommand::Draw(draw) => Some(draw),
                _ => None,
            })
            .collect()
    }

    /// Attribute bindings issued so far.
    pub fn attribute_bindings(&self) -> Vec<&AttributeBinding> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                DeviceCommand::BindVertexAttribute(binding) => Some(binding),
                _ => None,
            })
            .collect()
    }

    /// Device-side contents of a buffer.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(|data| data.as_slice())
    }

    pub fn texture(&self, texture: TextureHandle) -> Option<&DummyTexture> {
        self.textures.get(&texture.0)
    }

    /// Allocated size of a texture level.
    pub fn texture_level_size(&self, texture: TextureHandle, level: u32) -> Option<(u32, u32)> {
        self.texture(texture)
            .and_then(|tex| tex.levels.get(&level).copied())
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    fn report(&mut self, error: BackendError) {
        // Drivers keep the first error until it is queried.
        if self.pending_error.is_none() {
            self.pending_error = Some(error);
        }
    }

    fn texture_mut(&mut self, texture: TextureHandle) -> Option<&mut DummyTexture> {
        let found = self.textures.get_mut(&texture.0);
        if found.is_none() {
            log::trace!("DummyDevice: unknown texture {:?}", texture);
        }
        found
    }

    fn check_level_size(&mut self, width: u32, height: u32) -> bool {
        let max = self.capabilities.max_texture_size;
        if width > max || height > max {
            self.report(BackendError::OutOfMemory);
            return false;
        }
        true
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for DummyDevice {
    fn name(&self) -> &'static str {
        "Dummy Device"
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities.clone()
    }

    fn check_errors(&mut self) -> Option<BackendError> {
        self.pending_error.take()
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        log::trace!(
            "DummyDevice: creating buffer {:?} (size: {}, {:?})",
            desc.label,
            desc.size,
            desc.kind
        );
        let handle = BufferHandle(self.next_buffer_id);
        self.next_buffer_id += 1;
        self.buffers.insert(handle.0, vec![0; desc.size as usize]);
        self.commands.push(DeviceCommand::CreateBuffer {
            buffer: handle,
            size: desc.size,
        });
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        log::trace!(
            "DummyDevice: write_buffer {:?} offset={} len={}",
            buffer,
            offset,
            data.len()
        );
        self.commands.push(DeviceCommand::WriteBuffer {
            buffer,
            offset,
            len: data.len(),
        });
        let Some(len) = self.buffers.get(&buffer.0).map(Vec::len) else {
            self.report(BackendError::InvalidOperation(format!(
                "write to unknown buffer {buffer:?}"
            )));
            return;
        };
        let start = offset as usize;
        let end = start.saturating_add(data.len());
        if end > len {
            self.report(BackendError::InvalidOperation(format!(
                "write of {} bytes at {} overflows buffer of {} bytes",
                data.len(),
                offset,
                len
            )));
            return;
        }
        if let Some(contents) = self.buffers.get_mut(&buffer.0) {
            contents[start..end].copy_from_slice(data);
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        log::trace!("DummyDevice: destroy_buffer {:?}", buffer);
        self.buffers.remove(&buffer.0);
        self.commands.push(DeviceCommand::DestroyBuffer(buffer));
    }

    fn create_texture(&mut self) -> BackendResult<TextureHandle> {
        if self.fail_texture_creation {
            return Err(BackendError::OutOfMemory);
        }
        let handle = TextureHandle(self.next_texture_id);
        self.next_texture_id += 1;
        log::trace!("DummyDevice: creating texture {:?}", handle);
        self.textures.insert(handle.0, DummyTexture::default());
        self.commands.push(DeviceCommand::CreateTexture(handle));
        Ok(handle)
    }

    fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        self.commands.push(DeviceCommand::BindTexture(texture));
    }

    fn allocate_texture_level(
        &mut self,
        texture: TextureHandle,
        level: u32,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) {
        log::trace!(
            "DummyDevice: allocate level {} of {:?} ({}x{})",
            level,
            texture,
            width,
            height
        );
        self.commands.push(DeviceCommand::AllocateTextureLevel {
            texture,
            level,
            width,
            height,
            with_data: data.is_some(),
        });
        if !self.check_level_size(width, height) {
            return;
        }
        if let Some(tex) = self.texture_mut(texture) {
            tex.levels.insert(level, (width, height));
        }
    }

    fn write_texture_region(
        &mut self,
        texture: TextureHandle,
        level: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
    ) {
        log::trace!(
            "DummyDevice: write region {}x{} at ({}, {}) of {:?}, {} bytes",
            width,
            height,
            x,
            y,
            texture,
            data.len()
        );
        self.commands.push(DeviceCommand::WriteTextureRegion {
            texture,
            level,
            x,
            y,
            width,
            height,
        });
        let fits = self
            .texture(texture)
            .and_then(|tex| tex.levels.get(&level))
            .is_some_and(|&(w, h)| x + width <= w && y + height <= h);
        if !fits {
            self.report(BackendError::InvalidOperation(format!(
                "region {width}x{height} at ({x}, {y}) outside level {level} of {texture:?}"
            )));
        }
    }

    fn upload_compressed_level(
        &mut self,
        texture: TextureHandle,
        level: u32,
        format: CompressedFormat,
        width: u32,
        height: u32,
        data: &[u8],
    ) {
        log::trace!(
            "DummyDevice: upload {} level {} of {:?} ({}x{}, {} bytes)",
            format.name(),
            level,
            texture,
            width,
            height,
            data.len()
        );
        self.commands.push(DeviceCommand::UploadCompressedLevel {
            texture,
            level,
            format,
            width,
            height,
        });
        if !self.capabilities.supports_compressed(format) {
            self.report(BackendError::InvalidOperation(format!(
                "{} textures are not supported",
                format.name()
            )));
            return;
        }
        if !self.check_level_size(width, height) {
            return;
        }
        if let Some(tex) = self.texture_mut(texture) {
            tex.levels.insert(level, (width, height));
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureHandle) {
        self.commands.push(DeviceCommand::GenerateMipmaps(texture));
        let Some(&(mut width, mut height)) =
            self.texture(texture).and_then(|tex| tex.levels.get(&0))
        else {
            self.report(BackendError::InvalidOperation(format!(
                "generate mipmaps on {texture:?} without a base level"
            )));
            return;
        };
        if let Some(tex) = self.texture_mut(texture) {
            let mut level = 0;
            while width > 1 || height > 1 {
                level += 1;
                width = (width / 2).max(1);
                height = (height / 2).max(1);
                tex.levels.insert(level, (width, height));
            }
        }
    }

    fn set_auto_mipmap_generation(&mut self, texture: TextureHandle, enabled: bool) {
        self.commands
            .push(DeviceCommand::SetAutoMipmapGeneration { texture, enabled });
        if let Some(tex) = self.texture_mut(texture) {
            tex.auto_mipmaps = enabled;
        }
    }

    fn set_max_mip_level(&mut self, texture: TextureHandle, level: u32) {
        self.commands
            .push(DeviceCommand::SetMaxMipLevel { texture, level });
        if let Some(tex) = self.texture_mut(texture) {
            tex.max_level = Some(level);
        }
    }

    fn set_texture_filter(&mut self, texture: TextureHandle, filter: &Filter) -> f32 {
        let anisotropy = filter
            .anisotropy
            .clamp(1.0, self.capabilities.max_anisotropy.max(1.0));
        let applied = Filter {
            anisotropy,
            ..*filter
        };
        self.commands.push(DeviceCommand::SetTextureFilter {
            texture,
            filter: applied,
        });
        if let Some(tex) = self.texture_mut(texture) {
            tex.filter = Some(applied);
        }
        anisotropy
    }

    fn set_texture_wrap(&mut self, texture: TextureHandle, wrap: &Wrap) {
        self.commands
            .push(DeviceCommand::SetTextureWrap { texture, wrap: *wrap });
        if let Some(tex) = self.texture_mut(texture) {
            tex.wrap = Some(*wrap);
        }
    }

    fn set_lod_bias(&mut self, texture: TextureHandle, bias: f32) {
        self.commands.push(DeviceCommand::SetLodBias { texture, bias });
        let max = self.capabilities.max_lod_bias;
        if bias <= -max || bias >= max {
            self.report(BackendError::InvalidOperation(format!(
                "LOD bias {bias} outside (-{max}, {max})"
            )));
            return;
        }
        if let Some(tex) = self.texture_mut(texture) {
            tex.lod_bias = bias;
        }
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        log::trace!("DummyDevice: destroy_texture {:?}", texture);
        self.textures.remove(&texture.0);
        self.commands.push(DeviceCommand::DestroyTexture(texture));
    }

    fn set_transform(&mut self, transform: Mat4) {
        self.commands.push(DeviceCommand::SetTransform(transform));
    }

    fn bind_vertex_attribute(&mut self, binding: &AttributeBinding) {
        log::trace!(
            "DummyDevice: slot {} <- '{}' {:?}+{}",
            binding.slot,
            binding.name,
            binding.buffer,
            binding.offset
        );
        self.commands
            .push(DeviceCommand::BindVertexAttribute(binding.clone()));
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, format: IndexFormat) {
        self.commands
            .push(DeviceCommand::SetIndexBuffer { buffer, format });
    }

    fn draw(&mut self, command: &DrawCommand) {
        log::trace!(
            "DummyDevice: draw {:?} {:?} x{}{}",
            command.topology,
            command.range,
            command.instances,
            if command.is_indexed() { " (indexed)" } else { "" }
        );
        self.commands.push(DeviceCommand::Draw(command.clone()));
    }

    fn draw_vertices(&mut self, topology: PrimitiveTopology, vertices: &[Vertex2D]) {
        self.commands.push(DeviceCommand::DrawVertices {
            topology,
            vertices: vertices.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_device_name() {
        let device = DummyDevice::new();
        assert_eq!(device.name(), "Dummy Device");
    }

    #[test]
    fn test_buffer_writes_are_kept() {
        let mut device = DummyDevice::new();
        let buffer = device
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 8,
                kind: BufferKind::Vertex,
                usage: BufferUsageHint::Static,
            })
            .unwrap();
        device.write_buffer(buffer, 4, &[1, 2, 3, 4]);
        assert_eq!(
            device.buffer_contents(buffer),
            Some(&[0, 0, 0, 0, 1, 2, 3, 4][..])
        );
        assert!(device.check_errors().is_none());

        device.write_buffer(buffer, 6, &[1, 2, 3, 4]);
        assert!(matches!(
            device.check_errors(),
            Some(BackendError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_oversized_level_reports_out_of_memory() {
        let mut device = DummyDevice::with_capabilities(DeviceCapabilities::legacy());
        let texture = device.create_texture().unwrap();
        device.allocate_texture_level(texture, 0, 4096, 16, None);
        assert_eq!(device.check_errors(), Some(BackendError::OutOfMemory));
        assert_eq!(device.check_errors(), None);
        assert_eq!(device.texture_level_size(texture, 0), None);
    }

    #[test]
    fn test_generate_mipmaps_builds_chain() {
        let mut device = DummyDevice::new();
        let texture = device.create_texture().unwrap();
        device.allocate_texture_level(texture, 0, 8, 2, None);
        device.generate_mipmaps(texture);
        assert_eq!(device.texture_level_size(texture, 1), Some((4, 1)));
        assert_eq!(device.texture_level_size(texture, 3), Some((1, 1)));
        assert_eq!(device.texture_level_size(texture, 4), None);
    }
}
