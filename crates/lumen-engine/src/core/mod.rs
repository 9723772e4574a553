//! Core engine-facing contracts.
//!
//! The stable interface between the runtime (platform loop) and the
//! application: an [`App`] callback trait and the per-frame [`FrameCtx`].

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
