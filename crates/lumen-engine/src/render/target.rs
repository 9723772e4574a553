/// GPU display target for one frame (encoder + swapchain color view).
///
/// Both deferred passes record into the same encoder; the geometry pass
/// renders into the G-buffer, the composite pass into `color_view`.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }
}
