use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::FrameCtx;

/// What the runtime should do after an app callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    /// Sees every window event before the runtime reacts to it (resize,
    /// close, redraw). Returning `Exit` stops the loop without a final frame.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Advances the scene by `ctx.time` and renders one frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
