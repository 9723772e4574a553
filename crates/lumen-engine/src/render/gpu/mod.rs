//! wgpu implementation of the deferred backend.
//!
//! Both passes record into the frame's command encoder:
//! - geometry: MRT into three `Rgba16Float` attachments + `Depth32Float`
//! - composite: full-screen quad into the swapchain view, reading the
//!   attachments with `textureLoad` at the pixel's integer coordinate

mod attachments;
mod composite;
mod geometry;
mod quad;

use glam::Mat4;

use crate::coords::ViewportSize;
use crate::lighting::LightSample;
use crate::render::deferred::{
    CompositeConfig, DeferredBackend, GBufferReader, GBufferWriter, LightingCompositeProgram,
};
use crate::render::{RenderError, RenderTarget};
use crate::scene::{Camera, Scene};

pub use attachments::{AttachmentTexture, GpuGBuffer, GBUFFER_COLOR_FORMAT, GBUFFER_DEPTH_FORMAT};

use composite::CompositeRenderer;
use geometry::GeometryRenderer;

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    program: LightingCompositeProgram,
    geometry: GeometryRenderer,
    composite: CompositeRenderer,
}

impl WgpuBackend {
    /// Specializes the composite for `light_count` lights writing to
    /// `surface_format`. Pipelines are built lazily on the first frame.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        light_count: usize,
        config: CompositeConfig,
    ) -> Result<Self, RenderError> {
        let program = LightingCompositeProgram::specialize(light_count, config)?;
        if surface_format.is_srgb() {
            log::warn!("surface format {surface_format:?} is sRGB; composite output will be gamma encoded");
        }
        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            composite: CompositeRenderer::new(&program, surface_format),
            geometry: GeometryRenderer::default(),
            program,
        })
    }
}

impl DeferredBackend for WgpuBackend {
    type Storage = GpuGBuffer;
    type Target<'t> = RenderTarget<'t>;

    fn composite_program(&self) -> &LightingCompositeProgram {
        &self.program
    }

    fn allocate_gbuffer(&mut self, size: ViewportSize) -> Result<GpuGBuffer, RenderError> {
        GpuGBuffer::allocate(&self.device, size)
    }

    fn geometry_pass(
        &mut self,
        target: &mut Self::Target<'_>,
        gbuffer: &mut GBufferWriter<'_, GpuGBuffer>,
        scene: &Scene,
        camera: &Camera,
    ) -> Result<(), RenderError> {
        self.geometry.render(
            &self.device,
            &self.queue,
            target.encoder,
            gbuffer.storage_mut(),
            scene,
            camera,
        )
    }

    fn composite_pass(
        &mut self,
        target: &mut Self::Target<'_>,
        gbuffer: &GBufferReader<'_, GpuGBuffer>,
        lights: &[LightSample],
        camera_world: Mat4,
    ) -> Result<(), RenderError> {
        self.composite.render(
            &self.device,
            &self.queue,
            target,
            gbuffer,
            &self.program,
            lights,
            camera_world,
        )
    }
}
