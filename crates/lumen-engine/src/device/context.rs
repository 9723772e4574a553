use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::window::Window;

use crate::coords::ViewportSize;

use super::surface;
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Window-bound wgpu context: device, queue and the configured swapchain.
///
/// The deferred backend clones `device`/`queue` out of here; the surface and
/// its configuration stay owned by this type.
pub struct Gpu<'w> {
    // Dropped after the surface.
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    /// Drawable size in physical pixels. May be degenerate while minimized.
    size: ViewportSize,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to `window`.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let inner = window.inner_size();
        let size = ViewportSize::new(inner.width, inner.height);
        anyhow::ensure!(!size.is_degenerate(), "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("using adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = request_device(&adapter, &init).await?;
        let config = surface::initial_config(&surface.get_capabilities(&adapter), &init, size)
            .context("no supported surface formats")?;

        surface.configure(&device, &config);
        log::debug!("surface configured: {:?} {}x{}", config.format, size.width, size.height);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size,
        })
    }

    /// Format of the swapchain the composite pass writes into.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Current drawable size (physical pixels).
    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Records the new drawable size and reconfigures the surface if it is usable.
    pub fn resize(&mut self, new_size: ViewportSize) {
        self.size = new_size;
        surface::reconfigure(&self.surface, &self.device, &mut self.config, new_size);
    }

    /// Acquires the next swapchain image and a fresh encoder for the frame.
    pub fn acquire_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lumen frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits the recorded G-buffer and composite passes, then presents.
    pub fn present_frame(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
            encoder,
        } = frame;

        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }

    /// Maps an acquisition failure to what the frame loop should do next.
    pub fn recover_from(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        let action = surface::classify_error(&err);
        if action == SurfaceErrorAction::Reconfigured && !self.size.is_degenerate() {
            self.surface.configure(&self.device, &self.config);
        }
        log::debug!("surface error {err:?}: {action:?}");
        action
    }
}

async fn request_device(adapter: &wgpu::Adapter, init: &GpuInit) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("lumen device"),
            required_features: init.required_features,
            required_limits: init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")
}
