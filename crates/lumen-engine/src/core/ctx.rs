use winit::window::{Window, WindowId};

use crate::coords::ViewportSize;
use crate::device::{Gpu, SurfaceErrorAction};
use crate::render::RenderTarget;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Current drawable size in physical pixels. Zero while minimized on some
    /// platforms.
    pub fn viewport_size(&self) -> ViewportSize {
        let phys = self.window.inner_size();
        ViewportSize::new(phys.width, phys.height)
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires the next surface frame, lets `draw` record into it, then
    /// presents.
    ///
    /// Surface errors are handled here: lost/outdated surfaces are
    /// reconfigured and the frame skipped, fatal ones return
    /// `Ok(AppControl::Exit)`. If `draw` fails nothing is submitted and the
    /// acquired frame is discarded.
    pub fn render<F, E>(&mut self, draw: F) -> Result<AppControl, E>
    where
        F: FnOnce(&mut RenderTarget<'_>) -> Result<(), E>,
    {
        let mut frame = match self.gpu.acquire_frame() {
            Ok(f) => f,
            Err(err) => {
                let message = err.to_string();
                return Ok(match self.gpu.recover_from(err) {
                    SurfaceErrorAction::Fatal => {
                        log::error!("surface error is fatal: {message}");
                        AppControl::Exit
                    }
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => AppControl::Continue,
                });
            }
        };

        // RenderTarget borrows frame.encoder; dropped before present_frame() takes it.
        {
            let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
            draw(&mut target)?;
        }

        self.window.window.pre_present_notify();
        self.gpu.present_frame(frame);

        Ok(AppControl::Continue)
    }
}
