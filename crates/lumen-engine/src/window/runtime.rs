use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::ViewportSize;
use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::FrameClock;

/// When the runtime asks the window for a new frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RedrawPolicy {
    /// Redraw as fast as the present mode allows. Needed while lights animate.
    Continuous,
    /// Redraw only on resize, exposure, or other platform requests.
    OnDemand,
}

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub redraw: RedrawPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            redraw: RedrawPolicy::Continuous,
        }
    }
}

/// Runtime requests issued from inside `App::on_frame`.
///
/// Applied after the callback returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    exit: bool,
}

impl RuntimeCtx {
    /// Closes the window and leaves the event loop.
    pub fn exit(&mut self) {
        self.exit = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }
}

/// Entry point for the runtime: one window, one GPU context, one app.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut host = Host {
            config,
            gpu_init,
            app,
            surface: None,
            occluded: false,
            exiting: false,
        };

        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

/// The window and the GPU context that borrows it.
#[self_referencing]
struct WindowSurface {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

impl WindowSurface {
    fn id(&self) -> WindowId {
        self.with_window(|w| w.id())
    }

    fn request_redraw(&self) {
        self.with_window(|w| w.request_redraw());
    }

    fn resize(&mut self, size: ViewportSize) {
        self.with_gpu_mut(|gpu| gpu.resize(size));
        self.request_redraw();
    }
}

struct Host<A> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,
    surface: Option<WindowSurface>,
    occluded: bool,
    exiting: bool,
}

impl<A: App> Host<A> {
    fn open_window(&self, event_loop: &ActiveEventLoop) -> Result<WindowSurface> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        WindowSurfaceTryBuilder {
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)).context("GPU initialization failed"),
        }
        .try_build()
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        // Drop the GPU context before the loop exits so the surface goes first.
        self.surface = None;
        self.exiting = true;
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        let app = &mut self.app;
        let mut runtime = RuntimeCtx::default();
        let control = surface.with_mut(|fields| {
            let time = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: fields.window.id(),
                    window: fields.window,
                },
                gpu: fields.gpu,
                time,
                runtime: &mut runtime,
            };
            app.on_frame(&mut ctx)
        });

        if control == AppControl::Exit || runtime.exit_requested() {
            self.shut_down(event_loop);
        }
    }
}

impl<A: App> ApplicationHandler for Host<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }

        match self.open_window(event_loop) {
            Ok(surface) => {
                surface.request_redraw();
                self.surface = Some(surface);
            }
            Err(e) => {
                log::error!("failed to create window: {e:#}");
                self.shut_down(event_loop);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);
        if self.config.redraw == RedrawPolicy::Continuous && !self.occluded {
            if let Some(surface) = &self.surface {
                surface.request_redraw();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exiting || self.surface.as_ref().map(WindowSurface::id) != Some(window_id) {
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.shut_down(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => self.shut_down(event_loop),

            WindowEvent::Resized(physical) => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.resize(ViewportSize::new(physical.width, physical.height));
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(surface) = self.surface.as_mut() {
                    let inner = surface.with_window(|w| w.inner_size());
                    surface.resize(ViewportSize::new(inner.width, inner.height));
                }
            }

            WindowEvent::Occluded(occluded) => {
                self.occluded = occluded;
                if !occluded {
                    if let Some(surface) = self.surface.as_mut() {
                        // Fresh baseline so the hidden interval does not land in one dt.
                        surface.with_mut(|fields| fields.clock.reset());
                        surface.request_redraw();
                    }
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
