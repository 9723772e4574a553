/// A single acquired swapchain frame.
///
/// Short-lived: the G-buffer pass and the composite pass are both recorded into
/// `encoder`, then the frame goes back to [`Gpu::present_frame`](super::Gpu::present_frame).
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
