use crate::coords::ViewportSize;
use crate::render::deferred::{ColorAttachment, GBufferStorage, COLOR_ATTACHMENT_COUNT};
use crate::render::RenderError;

/// Format of every G-buffer color attachment. Half floats keep view-space
/// positions and emissive intensities above 1 intact.
pub const GBUFFER_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const GBUFFER_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug)]
pub struct AttachmentTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl AttachmentTexture {
    fn new(device: &wgpu::Device, size: ViewportSize, label: &str, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// Device-resident G-buffer: three color attachments plus depth.
#[derive(Debug)]
pub struct GpuGBuffer {
    size: ViewportSize,
    colors: [AttachmentTexture; COLOR_ATTACHMENT_COUNT],
    depth: AttachmentTexture,
}

impl GpuGBuffer {
    /// Allocates all four textures at `size`.
    ///
    /// Sizes beyond the device texture limit are refused up front, so a failed
    /// resize never leaves a partial set behind.
    pub fn allocate(device: &wgpu::Device, size: ViewportSize) -> Result<Self, RenderError> {
        let max = device.limits().max_texture_dimension_2d;
        if size.width > max || size.height > max {
            return Err(RenderError::ResourceExhaustion {
                size,
                reason: format!("exceeds device max_texture_dimension_2d ({max})"),
            });
        }

        Ok(Self {
            size,
            colors: ColorAttachment::ALL.map(|a| AttachmentTexture::new(device, size, a.label(), GBUFFER_COLOR_FORMAT)),
            depth: AttachmentTexture::new(device, size, "lumen gbuffer depth", GBUFFER_DEPTH_FORMAT),
        })
    }
}

impl GBufferStorage for GpuGBuffer {
    type Texture = AttachmentTexture;
    type DepthTexture = AttachmentTexture;

    fn size(&self) -> ViewportSize {
        self.size
    }

    fn color(&self, attachment: ColorAttachment) -> &AttachmentTexture {
        &self.colors[attachment.index()]
    }

    fn depth(&self) -> &AttachmentTexture {
        &self.depth
    }
}
