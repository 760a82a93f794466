//! Volatile 2D textures.
//!
//! A [`TextureResource`] keeps its decoded pixels for its whole life, so the
//! device texture can be dropped ([`unload`]) and rebuilt ([`load`]) at any
//! time, for example after the graphics context was lost.
//!
//! [`load`]: TextureResource::load
//! [`unload`]: TextureResource::unload

use std::sync::Arc;

use glam::Vec2;
use parking_lot::RwLock;

use crate::backend::{Filter, GraphicsDevice, PrimitiveTopology, TextureHandle, Vertex2D, Wrap};
use crate::config::TextureDefaults;
use crate::error::{GraphicsError, GraphicsResult};
use crate::scene::Transform2D;

use super::pixels::{CompressedImageData, ImageData, PixelSource};
use super::sampler::clamp_sharpness;
use super::upload::{MipmapStrategy, UploadStrategy};

/// A texture that meshes can share.
pub type SharedTexture = Arc<RwLock<TextureResource>>;

/// A 2D image that can be loaded onto and unloaded from a device.
#[derive(Debug)]
pub struct TextureResource {
    source: PixelSource,
    width: u32,
    height: u32,
    vertices: [Vertex2D; 4],
    filter: Filter,
    wrap: Wrap,
    mipmap_sharpness: f32,
    max_lod_bias: f32,
    mipmaps_created: bool,
    handle: Option<TextureHandle>,
    upload: Option<UploadStrategy>,
}

impl TextureResource {
    /// Create an unloaded texture.
    pub fn new(source: impl Into<PixelSource>, defaults: &TextureDefaults) -> Self {
        let source = source.into();
        let (width, height) = (source.width(), source.height());
        Self {
            vertices: quad(0.0, 0.0, width as f32, height as f32, width, height),
            source,
            width,
            height,
            filter: defaults.filter,
            wrap: defaults.wrap,
            mipmap_sharpness: defaults.mipmap_sharpness,
            max_lod_bias: 0.0,
            mipmaps_created: false,
            handle: None,
            upload: None,
        }
    }

    pub fn from_image(image: ImageData, defaults: &TextureDefaults) -> Self {
        Self::new(PixelSource::Raw(image), defaults)
    }

    pub fn from_compressed(image: CompressedImageData, defaults: &TextureDefaults) -> Self {
        Self::new(PixelSource::Compressed(image), defaults)
    }

    pub fn into_shared(self) -> SharedTexture {
        Arc::new(RwLock::new(self))
    }

    /// Create the device texture from the owned pixels. Does nothing if
    /// already loaded. On failure the texture stays unloaded.
    pub fn load<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) -> GraphicsResult<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let caps = device.capabilities();
        let strategy = UploadStrategy::select(&caps, &self.source)?;
        if caps.lod_bias && self.max_lod_bias == 0.0 {
            self.max_lod_bias = caps.max_lod_bias;
        }

        let handle = device
            .create_texture()
            .map_err(GraphicsError::from_allocation)?;
        self.handle = Some(handle);

        if let Err(err) = self.upload(device, handle, strategy) {
            log::debug!("Texture load failed: {}", err);
            self.unload(device);
            return Err(err);
        }
        self.upload = Some(strategy);

        log::debug!(
            "Loaded {}x{} texture {:?} ({:?})",
            self.width,
            self.height,
            handle,
            strategy
        );
        Ok(())
    }

    /// Release the device texture. Does nothing if not loaded.
    pub fn unload<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) {
        if let Some(handle) = self.handle.take() {
            device.destroy_texture(handle);
            self.mipmaps_created = false;
            log::debug!("Unloaded texture {:?}", handle);
        }
    }

    fn upload<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        handle: TextureHandle,
        strategy: UploadStrategy,
    ) -> GraphicsResult<()> {
        device.bind_texture(Some(handle));
        self.filter.anisotropy = device.set_texture_filter(handle, &self.filter);
        device.set_texture_wrap(handle, &self.wrap);

        discard_stale_errors(device);
        match (&self.source, strategy) {
            (PixelSource::Raw(image), UploadStrategy::Native) => {
                device.allocate_texture_level(
                    handle,
                    0,
                    image.width(),
                    image.height(),
                    Some(image.pixels()),
                );
            }
            (PixelSource::Raw(image), UploadStrategy::PaddedPowerOfTwo { width, height }) => {
                device.allocate_texture_level(handle, 0, width, height, None);
                device.write_texture_region(
                    handle,
                    0,
                    0,
                    0,
                    image.width(),
                    image.height(),
                    image.pixels(),
                );
            }
            (PixelSource::Compressed(image), _) => {
                let base = &image.levels()[0];
                device.upload_compressed_level(
                    handle,
                    0,
                    image.format(),
                    base.width,
                    base.height,
                    &base.data,
                );
            }
        }
        if let Some(err) = device.check_errors() {
            return Err(GraphicsError::ResourceExhausted(format!(
                "cannot create {}x{} texture: {}",
                self.width, self.height, err
            )));
        }

        self.mipmaps_created = false;
        self.ensure_mipmaps(device)?;
        self.set_mipmap_sharpness(device, self.mipmap_sharpness);
        Ok(())
    }

    /// Build the mip chain if the filter uses mipmaps and it does not exist yet.
    pub fn ensure_mipmaps<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
    ) -> GraphicsResult<()> {
        if self.mipmaps_created || !self.filter.mipmap.is_enabled() {
            return Ok(());
        }
        let Some(handle) = self.handle else {
            return Ok(());
        };

        let strategy = MipmapStrategy::select(&device.capabilities(), &self.source)?;
        device.bind_texture(Some(handle));
        discard_stale_errors(device);

        match (&self.source, strategy) {
            (PixelSource::Compressed(image), MipmapStrategy::CompressedLevels { max_level }) => {
                if let Some(level) = max_level {
                    device.set_max_mip_level(handle, level);
                }
                for (level, data) in image.levels().iter().enumerate().skip(1) {
                    device.upload_compressed_level(
                        handle,
                        level as u32,
                        image.format(),
                        data.width,
                        data.height,
                        &data.data,
                    );
                }
            }
            (PixelSource::Raw(image), MipmapStrategy::NativeGenerate) => {
                device.allocate_texture_level(
                    handle,
                    0,
                    image.width(),
                    image.height(),
                    Some(image.pixels()),
                );
                device.generate_mipmaps(handle);
            }
            (PixelSource::Raw(image), MipmapStrategy::LegacyAutoGenerate) => {
                device.set_auto_mipmap_generation(handle, true);
                device.write_texture_region(
                    handle,
                    0,
                    0,
                    0,
                    image.width(),
                    image.height(),
                    image.pixels(),
                );
            }
            (_, strategy) => {
                return Err(GraphicsError::UnsupportedOperation(format!(
                    "{strategy:?} does not apply to this pixel source"
                )));
            }
        }

        if let Some(err) = device.check_errors() {
            return Err(GraphicsError::ResourceExhausted(format!(
                "cannot create mipmaps: {err}"
            )));
        }
        self.mipmaps_created = true;
        log::debug!("Created mipmaps for texture {:?} ({:?})", handle, strategy);
        Ok(())
    }

    /// Change the filter, building mipmaps if it now needs them.
    pub fn set_filter<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        filter: Filter,
    ) -> GraphicsResult<()> {
        self.filter = filter;
        if let Some(handle) = self.handle {
            device.bind_texture(Some(handle));
            self.filter.anisotropy = device.set_texture_filter(handle, &self.filter);
            self.ensure_mipmaps(device)?;
        }
        Ok(())
    }

    pub fn set_wrap<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D, wrap: Wrap) {
        self.wrap = wrap;
        if let Some(handle) = self.handle {
            device.bind_texture(Some(handle));
            device.set_texture_wrap(handle, &self.wrap);
        }
    }

    /// Set how much sharper (positive) or blurrier (negative) mip selection is.
    ///
    /// Without LOD bias support the sharpness is reset to 0.
    pub fn set_mipmap_sharpness<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        sharpness: f32,
    ) {
        let caps = device.capabilities();
        if !caps.lod_bias {
            self.mipmap_sharpness = 0.0;
            return;
        }
        if self.max_lod_bias == 0.0 {
            self.max_lod_bias = caps.max_lod_bias;
        }

        self.mipmap_sharpness = clamp_sharpness(sharpness, self.max_lod_bias);
        if let Some(handle) = self.handle {
            device.bind_texture(Some(handle));
            device.set_lod_bias(handle, -self.mipmap_sharpness);
        }
    }

    /// Quad covering the whole image.
    pub fn vertices(&self) -> &[Vertex2D; 4] {
        &self.vertices
    }

    /// Quad for a sub-rectangle of the image.
    ///
    /// The rectangle is first shifted back inside the image, then clamped to
    /// the origin, so an oversized request is repositioned rather than cropped.
    pub fn rectangle_vertices(&self, x: i32, y: i32, width: i32, height: i32) -> [Vertex2D; 4] {
        let (image_width, image_height) = (self.width as i32, self.height as i32);
        let x = if x.saturating_add(width) > image_width {
            image_width.saturating_sub(width)
        } else {
            x
        };
        let y = if y.saturating_add(height) > image_height {
            image_height.saturating_sub(height)
        } else {
            y
        };
        let (x, y) = (x.max(0), y.max(0));
        quad(
            x as f32,
            y as f32,
            width as f32,
            height as f32,
            self.width,
            self.height,
        )
    }

    /// Draw the whole image.
    pub fn draw<D: GraphicsDevice + ?Sized>(&self, device: &mut D, transform: &Transform2D) {
        self.draw_quad(device, &self.vertices, transform);
    }

    /// Draw a sub-rectangle of the image.
    pub fn draw_rectangle<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        transform: &Transform2D,
    ) {
        let quad = self.rectangle_vertices(x, y, width, height);
        self.draw_quad(device, &quad, transform);
    }

    /// Draw an arbitrary quad with nominal texture coordinates.
    pub fn draw_quad<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        quad: &[Vertex2D; 4],
        transform: &Transform2D,
    ) {
        let Some(handle) = self.handle else {
            log::debug!("Skipping draw of unloaded {}x{} texture", self.width, self.height);
            return;
        };

        let scale = self.uv_scale();
        let scaled = quad.map(|v| Vertex2D {
            s: v.s * scale.x,
            t: v.t * scale.y,
            ..v
        });

        device.bind_texture(Some(handle));
        device.set_transform(transform.matrix());
        device.draw_vertices(PrimitiveTopology::TriangleFan, &scaled);
    }

    /// Factor applied to texture coordinates at draw time.
    pub fn uv_scale(&self) -> Vec2 {
        self.upload
            .map(|strategy| strategy.uv_scale(self.width, self.height))
            .unwrap_or(Vec2::ONE)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_compressed(&self) -> bool {
        self.source.is_compressed()
    }

    pub fn source(&self) -> &PixelSource {
        &self.source
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn wrap(&self) -> Wrap {
        self.wrap
    }

    pub fn mipmap_sharpness(&self) -> f32 {
        self.mipmap_sharpness
    }

    pub fn mipmaps_created(&self) -> bool {
        self.mipmaps_created
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<TextureHandle> {
        self.handle
    }

    /// Strategy used by the last successful load.
    pub fn upload_strategy(&self) -> Option<UploadStrategy> {
        self.upload
    }
}

impl Drop for TextureResource {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("Texture {:?} dropped while loaded; call unload first", handle);
        }
    }
}

fn discard_stale_errors<D: GraphicsDevice + ?Sized>(device: &mut D) {
    if let Some(err) = device.check_errors() {
        log::debug!("Discarding earlier device error: {}", err);
    }
}

fn quad(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    image_width: u32,
    image_height: u32,
) -> [Vertex2D; 4] {
    let (iw, ih) = (image_width as f32, image_height as f32);
    let (s0, t0) = (x / iw, y / ih);
    let (s1, t1) = ((x + width) / iw, (y + height) / ih);
    [
        Vertex2D::new(0.0, 0.0, s0, t0),
        Vertex2D::new(width, 0.0, s1, t0),
        Vertex2D::new(width, height, s1, t1),
        Vertex2D::new(0.0, height, s0, t1),
    ]
}
